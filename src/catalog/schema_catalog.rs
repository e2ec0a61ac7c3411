//! Per-table column schema resolution with a case-insensitive cache.
//!
//! A table schema is built from, in order of authority:
//! 1. the structured definition stored in `GDB_Items`,
//! 2. row sampling when no definition exists,
//! 3. `T_ILI2DB_COLUMN_PROP` hints layered on top of either.
//!
//! Columns start from the name-based defaults of [`ColumnSchema::new`].

use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::definition::{parse_definition, ItemDefinition};
use super::probe::{probe_first, Probe};
use super::type_resolver::{self, NativeFieldType};
use crate::core::{ColumnSchema, GeometryRole, Result, SqlType, TableSchema};
use crate::engine::{NativeEngine, RowHandle, Session, FEATURE_CLASS_ITEM_TYPE, ITEMS_TABLE};

pub const COLUMN_PROP_TABLE: &str = "T_ILI2DB_COLUMN_PROP";
pub const DEFAULT_SAMPLE_ROWS: usize = 256;

fn cache_key(table: &str) -> String {
    table.trim().to_lowercase()
}

pub struct SchemaCatalog {
    cache: HashMap<String, Arc<TableSchema>>,
    sample_rows: usize,
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_ROWS)
    }
}

impl SchemaCatalog {
    #[must_use]
    pub fn new(sample_rows: usize) -> Self {
        Self {
            cache: HashMap::new(),
            sample_rows,
        }
    }

    /// Resolved schema of `table`, loaded on first use.
    pub fn table_schema(&mut self, session: &mut Session, table: &str) -> Result<Arc<TableSchema>> {
        let key = cache_key(table);
        if let Some(schema) = self.cache.get(&key) {
            return Ok(Arc::clone(schema));
        }
        let schema = Arc::new(self.load(session, table.trim())?);
        self.cache.insert(key, Arc::clone(&schema));
        Ok(schema)
    }

    /// Cached schema without touching the engine.
    #[must_use]
    pub fn cached(&self, table: &str) -> Option<Arc<TableSchema>> {
        self.cache.get(&cache_key(table)).cloned()
    }

    /// Seeds the cache with a prebuilt schema.
    pub fn insert(&mut self, schema: TableSchema) {
        self.cache.insert(cache_key(&schema.table_name), Arc::new(schema));
    }

    pub fn invalidate_table(&mut self, table: &str) {
        if self.cache.remove(&cache_key(table)).is_some() {
            debug!("schema cache: invalidated {table}");
        }
    }

    pub fn invalidate_all(&mut self) {
        debug!("schema cache: invalidated {} tables", self.cache.len());
        self.cache.clear();
    }

    fn load(&self, session: &mut Session, table: &str) -> Result<TableSchema> {
        let field_names = session.field_names(table)?;
        let mut columns: Vec<ColumnSchema> = field_names.iter().map(ColumnSchema::new).collect();

        let definition = read_item_definition(session, table)?;
        match &definition {
            Some(def) => apply_definition(&mut columns, def),
            None => sample_types(session, table, &mut columns, self.sample_rows)?,
        }
        apply_column_props(session, table, &mut columns)?;

        debug!(
            "resolved schema for {table}: {} columns, definition={}",
            columns.len(),
            definition.is_some()
        );
        let (item_type, oid, shape) = match definition {
            Some(def) => (def.item_type_uuid, def.oid_field_name, def.shape_field_name),
            None => (None, None, None),
        };
        Ok(TableSchema::new(table, columns, item_type, oid, shape))
    }
}

/// Treats a missing metadata table as "no metadata".
fn skip_not_found(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

fn find_field<'a>(fields: &'a [String], wanted: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|f| f.eq_ignore_ascii_case(wanted))
        .map(String::as_str)
}

fn read_string(engine: &dyn NativeEngine, row: RowHandle, field: &str) -> Result<Option<String>> {
    Ok(engine.row_get_string(row, field)?)
}

/// Structured definition of `table` from `GDB_Items`, if one parses.
fn read_item_definition(session: &mut Session, table: &str) -> Result<Option<ItemDefinition>> {
    let fields = match session.field_names(ITEMS_TABLE) {
        Ok(fields) => fields,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };
    let (Some(name_field), Some(definition_field)) = (find_field(&fields, "Name"), find_field(&fields, "Definition"))
    else {
        return Ok(None);
    };
    let type_field = find_field(&fields, "Type").or_else(|| find_field(&fields, "ItemTypeUUID"));

    let mut found: Option<(String, Option<String>)> = None;
    let scanned = session.scan(ITEMS_TABLE, "*", "", |engine, row| {
        let Some(name) = read_string(engine, row, name_field)? else {
            return Ok(true);
        };
        if !name.trim().eq_ignore_ascii_case(table) {
            return Ok(true);
        }
        let xml = read_string(engine, row, definition_field)?.unwrap_or_default();
        let item_type = match type_field {
            Some(f) => read_string(engine, row, f)?,
            None => None,
        };
        found = Some((xml, item_type));
        Ok(false)
    });
    skip_not_found(scanned)?;

    Ok(found.and_then(|(xml, item_type)| {
        let mut definition = parse_definition(&xml)?;
        definition.item_type_uuid = item_type.filter(|t| !t.trim().is_empty());
        Some(definition)
    }))
}

fn apply_definition(columns: &mut [ColumnSchema], definition: &ItemDefinition) {
    let by_name: HashMap<String, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.to_lowercase(), i))
        .collect();
    let oid = definition.oid_field_name.as_deref().map(str::to_lowercase);
    let shape = definition.shape_field_name.as_deref().map(str::to_lowercase);

    for field in &definition.fields {
        let Some(&i) = by_name.get(&field.name.to_lowercase()) else {
            continue;
        };
        let column = &mut columns[i];
        column.native_type = field.field_type.clone();
        if let Some(nullable) = field.nullable {
            column.nullable = nullable;
        }
        if oid.as_deref() == Some(column.name.to_lowercase().as_str()) {
            column.oid_column = true;
            column.primary_key = true;
        }
        if let Some(field_type) = field.field_type.as_deref() {
            match type_resolver::from_native_field_type(field_type, field.length, field.scale) {
                NativeFieldType::Typed {
                    sql_type,
                    column_size,
                    decimal_digits,
                } => {
                    column.apply_type(sql_type, None, Some(column_size), Some(decimal_digits));
                    if sql_type == SqlType::Varchar {
                        column.char_octet_length = Some(column_size);
                    }
                }
                NativeFieldType::Geometry => column.set_geometry_role(GeometryRole::FeatureGeometry),
            }
        }
    }

    if let Some(shape) = &shape {
        if let Some(&i) = by_name.get(shape) {
            columns[i].set_geometry_role(GeometryRole::FeatureGeometry);
        }
    }

    let is_feature_class = definition
        .item_type_uuid
        .as_deref()
        .is_some_and(|t| same_guid(t, FEATURE_CLASS_ITEM_TYPE));
    if is_feature_class && shape.is_none() {
        for column in columns.iter_mut() {
            if column
                .native_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("esriFieldTypeGeometry"))
            {
                column.set_geometry_role(GeometryRole::FeatureGeometry);
            }
        }
    }
}

/// GUID equality ignoring case and braces; unparseable text compares as text.
fn same_guid(a: &str, b: &str) -> bool {
    match (Uuid::parse_str(a.trim()), Uuid::parse_str(b.trim())) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

fn pending(column: &ColumnSchema) -> bool {
    column.sql_type == SqlType::Varchar && !column.geometry_role.is_geometry()
}

/// Probes still-unresolved text columns over the first `limit` rows.
fn sample_types(session: &mut Session, table: &str, columns: &mut [ColumnSchema], limit: usize) -> Result<()> {
    if limit == 0 || !columns.iter().any(|c| pending(c)) {
        return Ok(());
    }

    let mut seen = 0usize;
    session.scan(table, "*", "", |engine, row| {
        for column in columns.iter_mut().filter(|c| pending(c)) {
            if engine.row_is_null(row, &column.name)? {
                continue;
            }
            if let Some((probe, _)) = probe_first(engine, row, &column.name)? {
                if probe != Probe::String {
                    column.apply_type(probe.sql_type(), None, None, None);
                }
            }
        }
        seen += 1;
        Ok(seen < limit && columns.iter().any(|c| pending(c)))
    })
}

fn is_blob_like(column: &ColumnSchema) -> bool {
    column.sql_type.is_binary()
        || column
            .native_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("esriFieldTypeBlob"))
}

fn apply_column_props(session: &mut Session, table: &str, columns: &mut [ColumnSchema]) -> Result<()> {
    let fields = match session.field_names(COLUMN_PROP_TABLE) {
        Ok(fields) => fields,
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(e),
    };
    let (Some(table_field), Some(column_field), Some(tag_field), Some(setting_field)) = (
        find_field(&fields, "tablename"),
        find_field(&fields, "columnname"),
        find_field(&fields, "tag"),
        find_field(&fields, "setting"),
    ) else {
        return Ok(());
    };

    let mut hints: Vec<(String, String, Option<String>)> = Vec::new();
    let scanned = session.scan(COLUMN_PROP_TABLE, "*", "", |engine, row| {
        let owner = read_string(engine, row, table_field)?.unwrap_or_default();
        if !owner.trim().eq_ignore_ascii_case(table) {
            return Ok(true);
        }
        if let (Some(column), Some(tag)) = (read_string(engine, row, column_field)?, read_string(engine, row, tag_field)?) {
            hints.push((column, tag, read_string(engine, row, setting_field)?));
        }
        Ok(true)
    });
    if !skip_not_found(scanned)? {
        return Ok(());
    }

    for (column_name, tag, setting) in hints {
        let Some(column) = columns.iter_mut().find(|c| c.name.eq_ignore_ascii_case(column_name.trim())) else {
            continue;
        };
        let tag = tag.to_lowercase();
        if tag.ends_with(".typekind") {
            let kind = setting.unwrap_or_default();
            if type_resolver::is_geometry_type_kind(&kind) && is_blob_like(column) {
                column.set_geometry_role(GeometryRole::EmbeddedBlob);
            }
            column.type_kind = Some(kind);
        } else if tag.ends_with(".geomtype") {
            column.geometry_type = setting;
        } else if tag.ends_with(".srid") {
            column.srid = setting;
        } else if tag.ends_with(".coorddimension") {
            column.coord_dimension = setting;
        }
    }
    Ok(())
}
