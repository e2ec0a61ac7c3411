/// Table scans
///
/// Reads engine rows into `ResultRow`s. Each field goes through the catalog
/// type when one exists, otherwise through the probe chain
/// (blob, int32, double, string). Geometry columns are normalized to WKB.

use log::{debug, warn};
use std::sync::Arc;

use super::ExecContext;
use crate::catalog::probe::{probe, Probe};
use crate::catalog::type_resolver::{is_likely_geometry_column, looks_binary_text};
use crate::core::{ColumnSchema, FgdbError, GeometryRole, ResultRow, Result, SqlType, TableSchema, Value};
use crate::engine::{EngineResult, NativeEngine, RowHandle};
use crate::geometry;
use crate::parser::literal::{decode_bytes, parse_value};

/// Runs `run`, reopening the session and retrying exactly once when the
/// engine reports a missing object.
pub fn with_retry<T>(
    ctx: &mut ExecContext<'_>,
    table: &str,
    mut run: impl FnMut(&mut ExecContext<'_>) -> Result<T>,
) -> Result<T> {
    match run(ctx) {
        Err(e) if e.is_not_found() => {
            debug!("{table} not found ({e}), reopening session for one retry");
            ctx.session.reopen()?;
            ctx.catalog.invalidate_all();
            ctx.tables.refresh(ctx.session);
            run(ctx).map_err(|e| {
                if e.is_not_found() && !ctx.tables.contains(table) {
                    FgdbError::TableNotFound(table.to_string())
                } else {
                    e
                }
            })
        }
        other => other,
    }
}

/// Scans `table` reading `columns` (all schema columns when empty) from
/// every row matching `where_clause`.
pub fn scan_rows(
    ctx: &mut ExecContext<'_>,
    schema: &TableSchema,
    columns: &[String],
    where_clause: &str,
) -> Result<Vec<ResultRow>> {
    let names = if columns.is_empty() {
        schema.column_names()
    } else {
        columns.to_vec()
    };
    let fields = if columns.is_empty() {
        "*".to_string()
    } else {
        names.iter().map(|n| format!("\"{n}\"")).collect::<Vec<_>>().join(",")
    };

    let mut rows = Vec::new();
    let warnings = &mut *ctx.warnings;
    ctx.session
        .scan(&schema.table_name, &fields, where_clause, |engine, row| {
            let mut out = ResultRow::new();
            for name in &names {
                let value = read_row_value(engine, row, name, schema.column(name), warnings)?;
                out.insert(name.clone(), value);
            }
            rows.push(out);
            Ok(true)
        })?;
    debug!("scanned {} rows from {}", rows.len(), schema.table_name);
    Ok(rows)
}

/// Schema plus every row of `table`, with the not-found retry.
pub fn load_table(ctx: &mut ExecContext<'_>, table: &str) -> Result<(Arc<TableSchema>, Vec<ResultRow>)> {
    with_retry(ctx, table, |ctx| {
        let schema = ctx.catalog.table_schema(ctx.session, table)?;
        let rows = scan_rows(ctx, &schema, &[], "")?;
        Ok((schema, rows))
    })
}

/// Reads one field of the current row.
///
/// Null is checked first. Geometry columns are read as bytes and normalized;
/// typed columns use the accessor for their type and fall back to text;
/// columns without a schema entry go through the probe chain.
pub fn read_row_value(
    engine: &dyn NativeEngine,
    row: RowHandle,
    column: &str,
    schema: Option<&ColumnSchema>,
    warnings: &mut Vec<String>,
) -> Result<Value> {
    if engine.row_is_null(row, column)? {
        return Ok(Value::Null);
    }
    let Some(schema) = schema else {
        return read_untyped(engine, row, column, warnings);
    };
    match schema.geometry_role {
        GeometryRole::FeatureGeometry => {
            let raw = match feature_geometry(engine, row)? {
                Some(bytes) => Some(bytes),
                None => blob_bytes(engine, row, column)?,
            };
            Ok(normalize_geometry(column, raw, warnings))
        }
        GeometryRole::EmbeddedBlob => {
            let raw = blob_bytes(engine, row, column)?;
            Ok(normalize_geometry(column, raw, warnings))
        }
        GeometryRole::None => Ok(read_typed(engine, row, column, schema.sql_type)?),
    }
}

fn read_typed(engine: &dyn NativeEngine, row: RowHandle, column: &str, sql_type: SqlType) -> EngineResult<Value> {
    let typed = match sql_type {
        SqlType::SmallInt | SqlType::Integer | SqlType::BigInt | SqlType::Boolean => {
            probe(engine, row, column, Probe::Int32)?
        }
        SqlType::Real | SqlType::Double | SqlType::Decimal => probe(engine, row, column, Probe::Double)?,
        SqlType::VarBinary | SqlType::Blob => probe(engine, row, column, Probe::Blob)?,
        SqlType::Date | SqlType::Time | SqlType::Timestamp | SqlType::Varchar => None,
    };
    let value = match typed {
        Some(value) => value,
        None => match probe(engine, row, column, Probe::String)? {
            Some(Value::Text(text)) => parse_value(&text),
            Some(other) => other,
            None => Value::Null,
        },
    };
    Ok(match (sql_type, value) {
        (SqlType::BigInt, Value::Int(i)) => Value::Long(i64::from(i)),
        (SqlType::Boolean, Value::Int(i)) => Value::Bool(i != 0),
        (SqlType::Boolean, Value::Text(text)) => match text.trim().to_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Text(text),
        },
        (_, value) => value,
    })
}

fn read_untyped(
    engine: &dyn NativeEngine,
    row: RowHandle,
    column: &str,
    warnings: &mut Vec<String>,
) -> Result<Value> {
    let geometry_name = is_likely_geometry_column(column);
    match probe(engine, row, column, Probe::Blob)? {
        Some(Value::Bytes(bytes)) if geometry_name => return Ok(normalize_geometry(column, Some(bytes), warnings)),
        Some(value) => return Ok(value),
        None => {}
    }
    for p in [Probe::Int32, Probe::Double] {
        if let Some(value) = probe(engine, row, column, p)? {
            return Ok(value);
        }
    }
    match probe(engine, row, column, Probe::String)? {
        Some(Value::Text(text)) => {
            if geometry_name || looks_binary_text(&text) {
                if let Some(bytes) = feature_geometry(engine, row)? {
                    return Ok(normalize_geometry(column, Some(bytes), warnings));
                }
            }
            Ok(parse_value(&text))
        }
        Some(other) => Ok(other),
        None if geometry_name => {
            let raw = feature_geometry(engine, row)?;
            Ok(normalize_geometry(column, raw, warnings))
        }
        None => Ok(Value::Null),
    }
}

/// The row's feature geometry; `None` when the table has none.
fn feature_geometry(engine: &dyn NativeEngine, row: RowHandle) -> EngineResult<Option<Vec<u8>>> {
    match engine.row_get_geometry(row) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.is_type_mismatch() || e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Bytes of a blob column, or of a tagged binary literal stored as text.
fn blob_bytes(engine: &dyn NativeEngine, row: RowHandle, column: &str) -> EngineResult<Option<Vec<u8>>> {
    match probe(engine, row, column, Probe::Blob)? {
        Some(Value::Bytes(bytes)) => Ok(Some(bytes)),
        Some(_) => Ok(None),
        None => Ok(match probe(engine, row, column, Probe::String)? {
            Some(Value::Text(text)) => decode_bytes(&text),
            _ => None,
        }),
    }
}

/// Normalizes geometry bytes to WKB. A decode failure keeps the raw bytes
/// and records a warning.
fn normalize_geometry(column: &str, raw: Option<Vec<u8>>, warnings: &mut Vec<String>) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };
    match geometry::normalize_to_wkb(&raw) {
        Ok(Some(wkb)) => Value::Bytes(wkb),
        Ok(None) => Value::Null,
        Err(e) => {
            warn!("geometry normalization failed for column {column}: {e}");
            warnings.push(format!("geometry normalization failed for column {column}: {e}"));
            Value::Bytes(raw)
        }
    }
}
