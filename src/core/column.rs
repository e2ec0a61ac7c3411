use serde::{Deserialize, Serialize};

use super::data_type::SqlType;
use crate::catalog::type_resolver;

/// How a column participates in geometry handling on the read path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GeometryRole {
    #[default]
    None,
    /// The table's feature geometry, read through the engine geometry accessor.
    FeatureGeometry,
    /// A plain blob column that carries encoded geometry.
    EmbeddedBlob,
}

impl GeometryRole {
    #[must_use]
    pub const fn is_geometry(self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    /// Engine-side field type tag from the structured definition, if any.
    pub native_type: Option<String>,
    pub sql_type: SqlType,
    pub type_name: String,
    pub column_size: Option<u32>,
    pub decimal_digits: Option<u32>,
    pub radix: Option<u32>,
    pub char_octet_length: Option<u32>,
    pub nullable: bool,
    pub primary_key: bool,
    pub oid_column: bool,
    pub geometry_role: GeometryRole,
    // Column-property hints
    pub type_kind: Option<String>,
    pub geometry_type: Option<String>,
    pub srid: Option<String>,
    pub coord_dimension: Option<String>,
}

impl ColumnSchema {
    /// Creates a column with the name-based default type.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let primary_key = type_resolver::is_primary_key_column(&name);
        let sql_type = if primary_key {
            SqlType::Integer
        } else if type_resolver::is_likely_geometry_column(&name) {
            SqlType::VarBinary
        } else {
            SqlType::Varchar
        };
        let oid_column = name.eq_ignore_ascii_case("OBJECTID") || name.eq_ignore_ascii_case("OID");
        let mut column = Self {
            type_name: String::new(),
            native_type: None,
            sql_type,
            column_size: None,
            decimal_digits: None,
            radix: None,
            char_octet_length: None,
            nullable: true,
            primary_key,
            oid_column,
            geometry_role: GeometryRole::None,
            type_kind: None,
            geometry_type: None,
            srid: None,
            coord_dimension: None,
            name,
        };
        column.apply_type(sql_type, None, None, None);
        column
    }

    /// Replaces the column type, filling unspecified attributes with defaults.
    pub fn apply_type(
        &mut self,
        sql_type: SqlType,
        type_name: Option<&str>,
        column_size: Option<u32>,
        decimal_digits: Option<u32>,
    ) {
        self.sql_type = sql_type;
        self.type_name = type_name.map_or_else(
            || type_resolver::type_name(sql_type, &self.name).to_string(),
            str::to_string,
        );
        self.column_size = column_size.or_else(|| type_resolver::default_column_size(sql_type));
        self.decimal_digits = decimal_digits.or_else(|| type_resolver::default_decimal_digits(sql_type));
        self.radix = type_resolver::default_radix(sql_type);
        self.char_octet_length = type_resolver::default_char_octet_length(sql_type);
    }

    /// Marks the column as geometry; geometry always surfaces as binary.
    pub fn set_geometry_role(&mut self, role: GeometryRole) {
        self.geometry_role = role;
        if role.is_geometry() {
            self.apply_type(SqlType::VarBinary, Some("GEOMETRY"), Some(type_resolver::MAX_SIZE), Some(0));
            self.char_octet_length = Some(type_resolver::MAX_SIZE);
        }
    }
}
