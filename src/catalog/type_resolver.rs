//! Type resolution helpers shared by the catalog, scans and result metadata.
//!
//! Everything here is a pure function over names, engine type tags or
//! sampled values; no engine access happens in this module.

use crate::core::{SqlType, Value};

/// Size reported for unbounded binary columns.
pub const MAX_SIZE: u32 = i32::MAX as u32;

/// Column names treated as row identifiers when nothing else is known.
pub fn is_primary_key_column(name: &str) -> bool {
    ["OBJECTID", "OID", "FID", "T_ID"]
        .iter()
        .any(|pk| name.eq_ignore_ascii_case(pk))
}

/// Column names that conventionally hold geometry.
pub fn is_likely_geometry_column(name: &str) -> bool {
    let normalized = name.trim().to_lowercase();
    matches!(normalized.as_str(), "shape" | "geometry" | "geometrie" | "wkb_geometry")
        || ["_shape", "_geom", "_geometry", "_geometrie"]
            .iter()
            .any(|suffix| normalized.ends_with(suffix))
}

/// Text that is most likely binary data rendered as a string: it contains a
/// NUL, or at least a quarter of its characters are non-whitespace controls.
pub fn looks_binary_text(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let mut control = 0usize;
    let mut total = 0usize;
    for c in value.chars() {
        if c == '\0' {
            return true;
        }
        if c.is_control() && !c.is_whitespace() {
            control += 1;
        }
        total += 1;
    }
    control > 0 && control * 4 >= total
}

/// Column type implied by a single value.
pub const fn type_from_value(value: &Value) -> SqlType {
    match value {
        Value::Int(_) => SqlType::Integer,
        Value::Long(_) => SqlType::BigInt,
        Value::Double(_) => SqlType::Double,
        Value::Decimal(_) => SqlType::Decimal,
        Value::Bool(_) => SqlType::Boolean,
        Value::Bytes(_) => SqlType::VarBinary,
        Value::Null | Value::Text(_) => SqlType::Varchar,
    }
}

/// Column type implied by the first non-null value of a materialized column.
pub fn infer_type<'a, I>(values: I) -> SqlType
where
    I: IntoIterator<Item = &'a Value>,
{
    values
        .into_iter()
        .find(|v| !v.is_null())
        .map_or(SqlType::Varchar, type_from_value)
}

/// Reported type name; binary columns with geometry-like names report `GEOMETRY`.
pub fn type_name(sql_type: SqlType, column: &str) -> &'static str {
    if sql_type.is_binary() && is_likely_geometry_column(column) {
        return "GEOMETRY";
    }
    sql_type.name()
}

pub const fn default_column_size(sql_type: SqlType) -> Option<u32> {
    Some(match sql_type {
        SqlType::SmallInt => 5,
        SqlType::Integer => 10,
        SqlType::BigInt => 19,
        SqlType::Real => 7,
        SqlType::Double => 15,
        SqlType::Decimal => 38,
        SqlType::Boolean => 1,
        SqlType::VarBinary | SqlType::Blob => MAX_SIZE,
        SqlType::Date => 10,
        SqlType::Time => 8,
        SqlType::Timestamp => 26,
        SqlType::Varchar => 4000,
    })
}

pub const fn default_decimal_digits(sql_type: SqlType) -> Option<u32> {
    Some(match sql_type {
        SqlType::Double => 15,
        SqlType::Real => 7,
        SqlType::Decimal => 10,
        _ => 0,
    })
}

pub const fn default_radix(sql_type: SqlType) -> Option<u32> {
    if sql_type.is_numeric() { Some(10) } else { None }
}

pub const fn default_char_octet_length(sql_type: SqlType) -> Option<u32> {
    match sql_type {
        SqlType::Varchar => Some(4000),
        SqlType::VarBinary => Some(MAX_SIZE),
        _ => None,
    }
}

/// Mapping of an engine field type tag from a structured item definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFieldType {
    Typed {
        sql_type: SqlType,
        column_size: u32,
        decimal_digits: u32,
    },
    Geometry,
}

/// Maps an `esriFieldType*` tag plus declared length and scale.
pub fn from_native_field_type(field_type: &str, length: Option<i32>, scale: Option<i32>) -> NativeFieldType {
    let positive = |v: Option<i32>| v.filter(|n| *n > 0).map(|n| n as u32);
    let integer_size = positive(length).unwrap_or(10);
    let digits = scale.map_or(0, |s| s.max(0) as u32);
    let typed = |sql_type, column_size, decimal_digits| NativeFieldType::Typed {
        sql_type,
        column_size,
        decimal_digits,
    };
    match field_type.trim().to_lowercase().as_str() {
        "esrifieldtypeoid" | "esrifieldtypeinteger" => typed(SqlType::Integer, integer_size, 0),
        "esrifieldtypesmallinteger" => typed(SqlType::SmallInt, 5, 0),
        "esrifieldtypebiginteger" => typed(SqlType::BigInt, 19, 0),
        "esrifieldtypedouble" => typed(SqlType::Double, integer_size, digits),
        "esrifieldtypesingle" => typed(SqlType::Real, integer_size, digits),
        "esrifieldtypedate" | "esrifieldtypetimestampoffset" => typed(SqlType::Timestamp, 26, 0),
        "esrifieldtypedateonly" => typed(SqlType::Date, 10, 0),
        "esrifieldtypetimeonly" => typed(SqlType::Time, 8, 0),
        "esrifieldtypeblob" | "esrifieldtyperaster" => typed(SqlType::Blob, MAX_SIZE, 0),
        "esrifieldtypegeometry" => NativeFieldType::Geometry,
        _ => typed(SqlType::Varchar, positive(length).unwrap_or(4000), 0),
    }
}

/// Engine field type tag for a SQL type keyword, used when writing definitions.
pub fn native_field_type_for(sql_type: SqlType) -> &'static str {
    match sql_type {
        SqlType::SmallInt | SqlType::Boolean => "esriFieldTypeSmallInteger",
        SqlType::Integer => "esriFieldTypeInteger",
        SqlType::BigInt => "esriFieldTypeBigInteger",
        SqlType::Real => "esriFieldTypeSingle",
        SqlType::Double | SqlType::Decimal => "esriFieldTypeDouble",
        SqlType::Date => "esriFieldTypeDateOnly",
        SqlType::Time => "esriFieldTypeTimeOnly",
        SqlType::Timestamp => "esriFieldTypeDate",
        SqlType::VarBinary | SqlType::Blob => "esriFieldTypeBlob",
        SqlType::Varchar => "esriFieldTypeString",
    }
}

/// `typeKind` column-property settings that denote geometry.
pub fn is_geometry_type_kind(type_kind: &str) -> bool {
    matches!(
        type_kind.trim().to_uppercase().as_str(),
        "COORD" | "MULTICOORD" | "POLYLINE" | "MULTIPOLYLINE" | "SURFACE" | "AREA" | "MULTISURFACE" | "MULTIAREA"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_names() {
        assert!(is_primary_key_column("objectid"));
        assert!(is_primary_key_column("T_Id"));
        assert!(is_primary_key_column("FID"));
        assert!(!is_primary_key_column("id"));
    }

    #[test]
    fn test_geometry_names() {
        assert!(is_likely_geometry_column("SHAPE"));
        assert!(is_likely_geometry_column("wkb_geometry"));
        assert!(is_likely_geometry_column("parcel_geom"));
        assert!(is_likely_geometry_column("Lage_Geometrie"));
        assert!(!is_likely_geometry_column("geomtype"));
    }

    #[test]
    fn test_binary_text_detection() {
        assert!(looks_binary_text("ab\0cd"));
        assert!(looks_binary_text("\u{1}\u{2}ab"));
        assert!(!looks_binary_text("plain text\n"));
        assert!(!looks_binary_text(""));
    }

    #[test]
    fn test_native_field_type_mapping() {
        assert_eq!(
            from_native_field_type("esriFieldTypeOID", None, None),
            NativeFieldType::Typed { sql_type: SqlType::Integer, column_size: 10, decimal_digits: 0 }
        );
        assert_eq!(
            from_native_field_type("esriFieldTypeString", Some(80), None),
            NativeFieldType::Typed { sql_type: SqlType::Varchar, column_size: 80, decimal_digits: 0 }
        );
        assert_eq!(
            from_native_field_type("esriFieldTypeDouble", Some(0), Some(3)),
            NativeFieldType::Typed { sql_type: SqlType::Double, column_size: 10, decimal_digits: 3 }
        );
        assert_eq!(from_native_field_type("esriFieldTypeGeometry", None, None), NativeFieldType::Geometry);
        assert_eq!(
            from_native_field_type("somethingElse", None, None),
            NativeFieldType::Typed { sql_type: SqlType::Varchar, column_size: 4000, decimal_digits: 0 }
        );
    }

    #[test]
    fn test_type_name_for_geometry_columns() {
        assert_eq!(type_name(SqlType::VarBinary, "Shape"), "GEOMETRY");
        assert_eq!(type_name(SqlType::VarBinary, "payload"), "VARBINARY");
        assert_eq!(type_name(SqlType::Integer, "shape"), "INTEGER");
    }

    #[test]
    fn test_infer_type_skips_nulls() {
        let values = [Value::Null, Value::Long(5)];
        assert_eq!(infer_type(values.iter()), SqlType::BigInt);
        assert_eq!(infer_type([Value::Null].iter()), SqlType::Varchar);
    }

    #[test]
    fn test_geometry_type_kinds() {
        assert!(is_geometry_type_kind("MultiSurface"));
        assert!(is_geometry_type_kind(" coord "));
        assert!(!is_geometry_type_kind("ENUM"));
    }
}
