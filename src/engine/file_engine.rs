//! Directory-backed [`NativeEngine`] implementation.
//!
//! Every open database keeps its full image in memory and rewrites the
//! directory after each mutation. Scans evaluate their filter once at
//! `search` time and hand out row copies, so a cursor never observes
//! writes made after it was opened.

use log::debug;
use quick_xml::escape::escape;
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::path::Path;

use super::error::{EngineError, EngineResult};
use super::store::{
    CodedDomain, DatabaseStore, DomainAssignment, GeoDatabase, StoredColumn, StoredTable,
    CODED_DOMAIN_ITEM_TYPE, FEATURE_CLASS_ITEM_TYPE, ITEMS_TABLE, ITEM_RELATIONSHIPS_TABLE,
    RELATIONSHIP_ITEM_TYPE, TABLE_ITEM_TYPE,
};
use super::{CursorHandle, DbHandle, NativeEngine, RelationshipClass, RowHandle, TableHandle};
use crate::catalog::type_resolver::native_field_type_for;
use crate::core::{SqlType, Value};
use crate::executor::conditions::{ColumnLookup, ConditionEvaluator};
use crate::parser::{self, literal, ColumnDef, ColumnRef, Condition, Statement};

struct OpenDatabase {
    store: DatabaseStore,
    db: GeoDatabase,
}

struct OpenTable {
    db: DbHandle,
    name: String,
}

/// Row copy handed out by a cursor.
#[derive(Clone)]
struct FetchedRow {
    columns: Vec<String>,
    values: Vec<Value>,
    geometry: Option<usize>,
}

impl FetchedRow {
    fn value(&self, column: &str) -> Option<&Value> {
        let column = column.trim().trim_matches('"');
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(column)))
            .map(|i| &self.values[i])
            .filter(|v| !v.is_null())
    }
}

struct Cursor {
    rows: VecDeque<FetchedRow>,
}

/// Stored row viewed through its table's columns.
struct StoredRow<'a> {
    table: &'a StoredTable,
    values: &'a [Value],
}

impl ColumnLookup for StoredRow<'_> {
    fn lookup(&self, column: &ColumnRef) -> Option<Value> {
        self.table
            .column_index(&column.name)
            .map(|i| self.values.get(i).cloned().unwrap_or(Value::Null))
    }
}

#[derive(Default)]
pub struct FileEngine {
    databases: HashMap<DbHandle, OpenDatabase>,
    tables: HashMap<TableHandle, OpenTable>,
    cursors: HashMap<CursorHandle, Cursor>,
    rows: HashMap<RowHandle, FetchedRow>,
    next_handle: u64,
}

impl FileEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn database(&self, db: DbHandle) -> EngineResult<&OpenDatabase> {
        self.databases
            .get(&db)
            .ok_or_else(|| EngineError::InvalidArgument(format!("invalid database handle {}", db.0)))
    }

    fn database_mut(&mut self, db: DbHandle) -> EngineResult<&mut OpenDatabase> {
        self.databases
            .get_mut(&db)
            .ok_or_else(|| EngineError::InvalidArgument(format!("invalid database handle {}", db.0)))
    }

    fn open_table_entry(&self, table: TableHandle) -> EngineResult<&OpenTable> {
        self.tables
            .get(&table)
            .ok_or_else(|| EngineError::InvalidArgument(format!("invalid table handle {}", table.0)))
    }

    fn row(&self, row: RowHandle) -> EngineResult<&FetchedRow> {
        self.rows
            .get(&row)
            .ok_or_else(|| EngineError::InvalidArgument(format!("invalid row handle {}", row.0)))
    }

    fn register(&mut self, store: DatabaseStore, db: GeoDatabase) -> DbHandle {
        let handle = DbHandle(self.allocate());
        self.databases.insert(handle, OpenDatabase { store, db });
        handle
    }

    /// Applies `f` to the database image and persists the result.
    fn mutate<T>(
        &mut self,
        db: DbHandle,
        f: impl FnOnce(&mut GeoDatabase) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let open = self.database_mut(db)?;
        let out = f(&mut open.db)?;
        open.store.save(&open.db)?;
        Ok(out)
    }
}

impl NativeEngine for FileEngine {
    fn open(&mut self, path: &Path) -> EngineResult<DbHandle> {
        let (store, db) = DatabaseStore::open(path)?;
        debug!("opened geodatabase {}", path.display());
        Ok(self.register(store, db))
    }

    fn create(&mut self, path: &Path) -> EngineResult<DbHandle> {
        let (store, db) = DatabaseStore::create(path)?;
        debug!("created geodatabase {}", path.display());
        Ok(self.register(store, db))
    }

    fn close(&mut self, db: DbHandle) -> EngineResult<()> {
        if self.databases.remove(&db).is_none() {
            return Err(EngineError::InvalidArgument(format!("invalid database handle {}", db.0)));
        }
        self.tables.retain(|_, t| t.db != db);
        Ok(())
    }

    fn exec_sql(&mut self, db: DbHandle, sql: &str) -> EngineResult<()> {
        let statement = parser::parse_statement(sql).map_err(EngineError::InvalidArgument)?;
        match statement {
            Statement::CreateTable { name, columns } => self.mutate(db, |gdb| create_table(gdb, &name, &columns)),
            Statement::DropTable { name } => self.mutate(db, |gdb| drop_table(gdb, &name)),
            Statement::Insert { table, columns, rows } => {
                self.mutate(db, |gdb| insert_rows(gdb.table_mut(&table)?, columns.as_deref(), rows))
            }
            Statement::Update { table, assignments, filter } => {
                self.mutate(db, |gdb| update_rows(gdb.table_mut(&table)?, &assignments, filter.as_ref()))
            }
            Statement::Delete { from, filter } => {
                self.mutate(db, |gdb| delete_rows(gdb.table_mut(&from)?, filter.as_ref()))
            }
            Statement::Select(_) => Err(EngineError::InvalidArgument(
                "queries are not executed through exec_sql; use search".to_string(),
            )),
        }
    }

    fn open_table(&mut self, db: DbHandle, name: &str) -> EngineResult<TableHandle> {
        let table_name = self.database(db)?.db.table(name)?.name.clone();
        let handle = TableHandle(self.allocate());
        self.tables.insert(handle, OpenTable { db, name: table_name });
        Ok(handle)
    }

    fn close_table(&mut self, db: DbHandle, table: TableHandle) -> EngineResult<()> {
        match self.tables.get(&table) {
            Some(open) if open.db == db => {
                self.tables.remove(&table);
                Ok(())
            }
            _ => Err(EngineError::InvalidArgument(format!("invalid table handle {}", table.0))),
        }
    }

    fn field_names(&self, table: TableHandle) -> EngineResult<Vec<String>> {
        let open = self.open_table_entry(table)?;
        let stored = self.database(open.db)?.db.table(&open.name)?;
        Ok(stored.columns.iter().map(|c| c.name.clone()).collect())
    }

    fn search(&mut self, table: TableHandle, fields: &str, where_clause: &str) -> EngineResult<CursorHandle> {
        let open = self.open_table_entry(table)?;
        let stored = self.database(open.db)?.db.table(&open.name)?;

        for field in fields.split(',').map(str::trim).filter(|f| !f.is_empty() && *f != "*") {
            if stored.column_index(field).is_none() {
                return Err(EngineError::InvalidArgument(format!("unknown field {field}")));
            }
        }

        let filter = if where_clause.trim().is_empty() {
            None
        } else {
            Some(parser::parse_condition(where_clause).map_err(EngineError::InvalidArgument)?)
        };
        if let Some(unknown) = filter
            .iter()
            .flat_map(Condition::columns)
            .find(|c| stored.column_index(&c.name).is_none())
        {
            return Err(EngineError::InvalidArgument(format!("unknown field {}", unknown.name)));
        }

        let columns: Vec<String> = stored.columns.iter().map(|c| c.name.clone()).collect();
        let geometry = stored.geometry_index();
        let mut rows = VecDeque::new();
        for values in &stored.rows {
            if matches_filter(stored, values, filter.as_ref())? {
                rows.push_back(FetchedRow {
                    columns: columns.clone(),
                    values: values.clone(),
                    geometry,
                });
            }
        }

        let handle = CursorHandle(self.allocate());
        self.cursors.insert(handle, Cursor { rows });
        Ok(handle)
    }

    fn fetch_row(&mut self, cursor: CursorHandle) -> EngineResult<Option<RowHandle>> {
        let next = self
            .cursors
            .get_mut(&cursor)
            .ok_or_else(|| EngineError::InvalidArgument(format!("invalid cursor handle {}", cursor.0)))?
            .rows
            .pop_front();
        match next {
            Some(row) => {
                let handle = RowHandle(self.allocate());
                self.rows.insert(handle, row);
                Ok(Some(handle))
            }
            None => Ok(None),
        }
    }

    fn close_row(&mut self, row: RowHandle) -> EngineResult<()> {
        self.rows
            .remove(&row)
            .map(|_| ())
            .ok_or_else(|| EngineError::InvalidArgument(format!("invalid row handle {}", row.0)))
    }

    fn close_cursor(&mut self, cursor: CursorHandle) -> EngineResult<()> {
        self.cursors
            .remove(&cursor)
            .map(|_| ())
            .ok_or_else(|| EngineError::InvalidArgument(format!("invalid cursor handle {}", cursor.0)))
    }

    fn row_is_null(&self, row: RowHandle, column: &str) -> EngineResult<bool> {
        Ok(self.row(row)?.value(column).is_none())
    }

    fn row_get_string(&self, row: RowHandle, column: &str) -> EngineResult<Option<String>> {
        Ok(self.row(row)?.value(column).map(|v| match v {
            Value::Text(s) => s.clone(),
            Value::Bytes(_) => "<binary>".to_string(),
            other => other.to_string(),
        }))
    }

    fn row_get_int32(&self, row: RowHandle, column: &str) -> EngineResult<Option<i32>> {
        match self.row(row)?.value(column) {
            None => Ok(None),
            Some(Value::Int(i)) => Ok(Some(*i)),
            Some(_) => Err(EngineError::InvalidArgument("row value is not int32".to_string())),
        }
    }

    fn row_get_double(&self, row: RowHandle, column: &str) -> EngineResult<Option<f64>> {
        match self.row(row)?.value(column) {
            None => Ok(None),
            Some(v @ (Value::Double(_) | Value::Int(_) | Value::Long(_))) => Ok(v.as_f64()),
            Some(_) => Err(EngineError::InvalidArgument("row value is not double".to_string())),
        }
    }

    fn row_get_blob(&self, row: RowHandle, column: &str) -> EngineResult<Option<Vec<u8>>> {
        match self.row(row)?.value(column) {
            None => Ok(None),
            Some(Value::Bytes(b)) => Ok(Some(b.clone())),
            Some(_) => Err(EngineError::InvalidArgument("row value is not blob".to_string())),
        }
    }

    fn row_get_geometry(&self, row: RowHandle) -> EngineResult<Option<Vec<u8>>> {
        let fetched = self.row(row)?;
        match fetched.geometry.and_then(|i| fetched.values.get(i)) {
            Some(Value::Bytes(b)) => Ok(Some(b.clone())),
            _ => Ok(None),
        }
    }

    fn list_table_names(&self, db: DbHandle) -> EngineResult<Vec<String>> {
        Ok(self.database(db)?.db.tables.iter().map(|t| t.name.clone()).collect())
    }

    fn list_domains(&self, db: DbHandle) -> EngineResult<Vec<String>> {
        Ok(self.database(db)?.db.domains.keys().cloned().collect())
    }

    fn list_relationships(&self, db: DbHandle) -> EngineResult<Vec<String>> {
        Ok(self.database(db)?.db.relationships.keys().cloned().collect())
    }

    fn create_coded_domain(&mut self, db: DbHandle, name: &str, field_type: &str) -> EngineResult<()> {
        self.mutate(db, |gdb| {
            if gdb.domains.keys().any(|d| d.eq_ignore_ascii_case(name)) {
                return Err(EngineError::AlreadyExists(format!("domain {name}")));
            }
            let domain = CodedDomain {
                field_type: field_type.to_string(),
                coded_values: Vec::new(),
            };
            put_item(gdb, name, CODED_DOMAIN_ITEM_TYPE, &domain_definition(name, &domain))?;
            gdb.domains.insert(name.to_string(), domain);
            Ok(())
        })
    }

    fn add_coded_value(&mut self, db: DbHandle, domain: &str, code: &str, label: &str) -> EngineResult<()> {
        self.mutate(db, |gdb| {
            let key = gdb
                .domains
                .keys()
                .find(|d| d.eq_ignore_ascii_case(domain))
                .cloned()
                .ok_or_else(|| EngineError::NotFound(format!("domain not found: {domain}")))?;
            let definition = gdb.domains.get_mut(&key).map(|entry| {
                entry.coded_values.push((code.to_string(), label.to_string()));
                domain_definition(&key, entry)
            });
            if let Some(definition) = definition {
                put_item(gdb, &key, CODED_DOMAIN_ITEM_TYPE, &definition)?;
            }
            Ok(())
        })
    }

    fn assign_domain_to_field(&mut self, db: DbHandle, table: &str, column: &str, domain: &str) -> EngineResult<()> {
        self.mutate(db, |gdb| {
            let stored = gdb.table(table)?;
            if stored.column_index(column).is_none() {
                return Err(EngineError::NotFound(format!("field not found: {table}.{column}")));
            }
            let table = stored.name.clone();
            if !gdb.domains.keys().any(|d| d.eq_ignore_ascii_case(domain)) {
                return Err(EngineError::NotFound(format!("domain not found: {domain}")));
            }
            gdb.assignments.retain(|a| !(a.table == table && a.column.eq_ignore_ascii_case(column)));
            gdb.assignments.push(DomainAssignment {
                table,
                column: column.to_string(),
                domain: domain.to_string(),
            });
            Ok(())
        })
    }

    fn create_relationship_class(&mut self, db: DbHandle, relationship: &RelationshipClass) -> EngineResult<()> {
        self.mutate(db, |gdb| {
            let origin = gdb.table(&relationship.origin_table)?;
            if origin.column_index(&relationship.origin_pk).is_none() {
                return Err(EngineError::NotFound(format!(
                    "field not found: {}.{}",
                    relationship.origin_table, relationship.origin_pk
                )));
            }
            let destination = gdb.table(&relationship.destination_table)?;
            if destination.column_index(&relationship.origin_fk).is_none() {
                return Err(EngineError::NotFound(format!(
                    "field not found: {}.{}",
                    relationship.destination_table, relationship.origin_fk
                )));
            }
            if gdb.relationships.keys().any(|r| r.eq_ignore_ascii_case(&relationship.name)) {
                return Err(EngineError::AlreadyExists(format!("relationship class {}", relationship.name)));
            }

            put_item(gdb, &relationship.name, RELATIONSHIP_ITEM_TYPE, &relationship_definition(relationship))?;
            gdb.table_mut(ITEM_RELATIONSHIPS_TABLE)?.rows.push(vec![
                Value::Text(relationship.origin_table.clone()),
                Value::Text(relationship.destination_table.clone()),
                Value::Text(relationship.name.clone()),
            ]);
            gdb.relationships.insert(relationship.name.clone(), relationship.clone());
            Ok(())
        })
    }
}

fn matches_filter(table: &StoredTable, values: &[Value], filter: Option<&Condition>) -> EngineResult<bool> {
    match filter {
        None => Ok(true),
        Some(cond) => ConditionEvaluator::evaluate(&StoredRow { table, values }, cond)
            .map_err(|e| EngineError::InvalidArgument(e.to_string())),
    }
}

fn create_table(gdb: &mut GeoDatabase, name: &str, columns: &[ColumnDef]) -> EngineResult<()> {
    if gdb.table_index(name).is_some() {
        return Err(EngineError::AlreadyExists(format!("table {name}")));
    }
    let mut stored_columns: Vec<StoredColumn> = Vec::with_capacity(columns.len());
    for def in columns {
        if stored_columns.iter().any(|c| c.name.eq_ignore_ascii_case(&def.name)) {
            return Err(EngineError::InvalidArgument(format!("duplicate column {}", def.name)));
        }
        let mut column = StoredColumn::new(&def.name, def.data_type);
        column.length = def.length;
        column.nullable = def.nullable;
        column.geometry = def.geometry;
        stored_columns.push(column);
    }
    if stored_columns.iter().filter(|c| c.geometry).count() > 1 {
        return Err(EngineError::InvalidArgument(format!("table {name} declares more than one geometry")));
    }

    let oid = columns
        .iter()
        .find(|c| c.primary_key && c.data_type.is_integral())
        .or_else(|| columns.iter().find(|c| c.name.eq_ignore_ascii_case("OBJECTID")))
        .map(|c| c.name.clone());
    let table = StoredTable::new(name, stored_columns);
    let item_type = if table.geometry_index().is_some() {
        FEATURE_CLASS_ITEM_TYPE
    } else {
        TABLE_ITEM_TYPE
    };
    put_item(gdb, name, item_type, &table_definition(&table, oid.as_deref()))?;
    gdb.tables.push(table);
    Ok(())
}

fn drop_table(gdb: &mut GeoDatabase, name: &str) -> EngineResult<()> {
    let index = gdb
        .table_index(name)
        .ok_or_else(|| EngineError::NotFound(format!("table not found: {name}")))?;
    if gdb.tables[index].is_system() {
        return Err(EngineError::InvalidArgument(format!("cannot drop system table {name}")));
    }
    let dropped = gdb.tables.remove(index);
    gdb.assignments.retain(|a| a.table != dropped.name);
    remove_item(gdb, &dropped.name)?;
    Ok(())
}

/// Column positions for an INSERT column list; `None` means all columns in order.
fn target_columns(table: &StoredTable, columns: Option<&[String]>) -> EngineResult<Vec<usize>> {
    match columns {
        None => Ok((0..table.columns.len()).collect()),
        Some(names) => names
            .iter()
            .map(|n| {
                table
                    .column_index(n)
                    .ok_or_else(|| EngineError::InvalidArgument(format!("unknown column {n}")))
            })
            .collect(),
    }
}

fn insert_rows(table: &mut StoredTable, columns: Option<&[String]>, rows: Vec<Vec<Value>>) -> EngineResult<()> {
    let targets = target_columns(table, columns)?;
    let mut prepared = Vec::with_capacity(rows.len());
    for values in rows {
        if values.len() != targets.len() {
            return Err(EngineError::InvalidArgument(format!(
                "expected {} values, got {}",
                targets.len(),
                values.len()
            )));
        }
        let mut row = vec![Value::Null; table.columns.len()];
        for (&idx, value) in targets.iter().zip(values) {
            row[idx] = coerce(value, &table.columns[idx])?;
        }
        for (column, value) in table.columns.iter().zip(&row) {
            if !column.nullable && value.is_null() {
                return Err(EngineError::InvalidArgument(format!("column {} may not be null", column.name)));
            }
        }
        prepared.push(row);
    }
    table.rows.extend(prepared);
    Ok(())
}

fn update_rows(table: &mut StoredTable, assignments: &[(String, Value)], filter: Option<&Condition>) -> EngineResult<()> {
    let mut coerced = Vec::with_capacity(assignments.len());
    for (name, value) in assignments {
        let idx = table
            .column_index(name)
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown column {name}")))?;
        let value = coerce(value.clone(), &table.columns[idx])?;
        if value.is_null() && !table.columns[idx].nullable {
            return Err(EngineError::InvalidArgument(format!("column {name} may not be null")));
        }
        coerced.push((idx, value));
    }

    let mut matched = Vec::new();
    for (i, values) in table.rows.iter().enumerate() {
        if matches_filter(table, values, filter)? {
            matched.push(i);
        }
    }
    for i in matched {
        for (idx, value) in &coerced {
            table.rows[i][*idx] = value.clone();
        }
    }
    Ok(())
}

fn delete_rows(table: &mut StoredTable, filter: Option<&Condition>) -> EngineResult<()> {
    let mut keep = Vec::with_capacity(table.rows.len());
    for values in &table.rows {
        keep.push(!matches_filter(table, values, filter)?);
    }
    let mut flags = keep.into_iter();
    table.rows.retain(|_| flags.next().unwrap_or(true));
    Ok(())
}

/// Converts a literal to the storage representation of `column`.
fn coerce(value: Value, column: &StoredColumn) -> EngineResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let mismatch = |v: &Value| {
        EngineError::InvalidArgument(format!("value {v} is not valid for column {} ({})", column.name, column.sql_type))
    };
    if column.geometry || column.sql_type.is_binary() {
        return match value {
            Value::Bytes(b) => Ok(Value::Bytes(b)),
            Value::Text(ref s) => literal::decode_bytes(s).map(Value::Bytes).ok_or_else(|| mismatch(&value)),
            other => Err(mismatch(&other)),
        };
    }
    match column.sql_type {
        SqlType::SmallInt | SqlType::Integer | SqlType::Boolean => value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int)
            .ok_or_else(|| mismatch(&value)),
        SqlType::BigInt => value.as_i64().map(Value::Long).ok_or_else(|| mismatch(&value)),
        SqlType::Real | SqlType::Double | SqlType::Decimal => {
            value.as_f64().map(Value::Double).ok_or_else(|| mismatch(&value))
        }
        _ => match value {
            Value::Text(s) => Ok(Value::Text(s)),
            Value::Bytes(_) => Err(mismatch(&value)),
            other => Ok(Value::Text(other.to_string())),
        },
    }
}

/// Replaces the GDB_Items row named `name` (ignoring case) or appends one.
fn put_item(gdb: &mut GeoDatabase, name: &str, item_type: &str, definition: &str) -> EngineResult<()> {
    let items = gdb.table_mut(ITEMS_TABLE)?;
    let row = vec![
        Value::Text(name.to_string()),
        Value::Text(item_type.to_string()),
        Value::Text(item_type.to_string()),
        Value::Text(definition.to_string()),
    ];
    let existing = items
        .rows
        .iter()
        .position(|r| matches!(r.first(), Some(Value::Text(n)) if n.eq_ignore_ascii_case(name)));
    match existing {
        Some(i) => items.rows[i] = row,
        None => items.rows.push(row),
    }
    Ok(())
}

fn remove_item(gdb: &mut GeoDatabase, name: &str) -> EngineResult<()> {
    let items = gdb.table_mut(ITEMS_TABLE)?;
    items
        .rows
        .retain(|r| !matches!(r.first(), Some(Value::Text(n)) if n.eq_ignore_ascii_case(name)));
    Ok(())
}

fn table_definition(table: &StoredTable, oid: Option<&str>) -> String {
    let info = if table.geometry_index().is_some() {
        "DEFeatureClassInfo"
    } else {
        "DETableInfo"
    };
    let mut xml = format!(
        "<{info} xsi:type=\"typens:{info}\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xmlns:typens=\"http://www.esri.com/schemas/ArcGIS/10.1\">"
    );
    let _ = write!(xml, "<CatalogPath>\\{0}</CatalogPath><Name>{0}</Name>", escape(table.name.as_str()));
    if let Some(oid) = oid {
        let _ = write!(xml, "<HasOID>true</HasOID><OIDFieldName>{}</OIDFieldName>", escape(oid));
    }
    xml.push_str("<GPFieldInfoExs xsi:type=\"typens:ArrayOfGPFieldInfoEx\">");
    for column in &table.columns {
        let field_type = if column.geometry {
            "esriFieldTypeGeometry"
        } else if oid.is_some_and(|o| o.eq_ignore_ascii_case(&column.name)) {
            "esriFieldTypeOID"
        } else {
            native_field_type_for(column.sql_type)
        };
        let _ = write!(
            xml,
            "<GPFieldInfoEx xsi:type=\"typens:GPFieldInfoEx\"><Name>{}</Name><FieldType>{field_type}</FieldType>\
             <IsNullable>{}</IsNullable>",
            escape(column.name.as_str()),
            column.nullable
        );
        if let Some(length) = column.length {
            let _ = write!(xml, "<Length>{length}</Length>");
        }
        xml.push_str("</GPFieldInfoEx>");
    }
    xml.push_str("</GPFieldInfoExs>");
    if let Some(i) = table.geometry_index() {
        let _ = write!(xml, "<ShapeFieldName>{}</ShapeFieldName>", escape(table.columns[i].name.as_str()));
    }
    let _ = write!(xml, "</{info}>");
    xml
}

fn domain_definition(name: &str, domain: &CodedDomain) -> String {
    let mut xml = format!(
        "<GPCodedValueDomain2><DomainName>{}</DomainName><FieldType>{}</FieldType><CodedValues>",
        escape(name),
        escape(domain.field_type.as_str())
    );
    for (code, label) in &domain.coded_values {
        let _ = write!(
            xml,
            "<CodedValue><Name>{}</Name><Code>{}</Code></CodedValue>",
            escape(label.as_str()),
            escape(code.as_str())
        );
    }
    xml.push_str("</CodedValues></GPCodedValueDomain2>");
    xml
}

fn relationship_definition(rel: &RelationshipClass) -> String {
    format!(
        "<DERelationshipClassInfo><Name>{}</Name><Cardinality>{}</Cardinality>\
         <IsComposite>{}</IsComposite><IsAttributed>{}</IsAttributed>\
         <OriginClassNames><Name>{}</Name></OriginClassNames>\
         <DestinationClassNames><Name>{}</Name></DestinationClassNames>\
         <OriginPrimaryKey>{}</OriginPrimaryKey><OriginForeignKey>{}</OriginForeignKey>\
         <ForwardPathLabel>{}</ForwardPathLabel><BackwardPathLabel>{}</BackwardPathLabel>\
         </DERelationshipClassInfo>",
        escape(rel.name.as_str()),
        escape(rel.cardinality.as_str()),
        rel.composite,
        rel.attributed,
        escape(rel.origin_table.as_str()),
        escape(rel.destination_table.as_str()),
        escape(rel.origin_pk.as_str()),
        escape(rel.origin_fk.as_str()),
        escape(rel.forward_label.as_str()),
        escape(rel.backward_label.as_str()),
    )
}
