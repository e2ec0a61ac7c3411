//! On-disk layout of a [`FileEngine`](super::FileEngine) database.
//!
//! A database is a directory holding a JSON manifest (tables, columns,
//! domains, relationship classes) and a bincode file with the row data.
//! Every mutation rewrites both, so copying the directory captures the
//! complete database state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{EngineError, EngineResult};
use super::RelationshipClass;
use crate::core::{SqlType, Value};

pub const MANIFEST_FILE: &str = "gdb.manifest.json";
pub const ROWS_FILE: &str = "gdb.rows";

pub const ITEMS_TABLE: &str = "GDB_Items";
pub const ITEM_RELATIONSHIPS_TABLE: &str = "GDB_ItemRelationships";

// Item type tags written to GDB_Items.Type
pub const FEATURE_CLASS_ITEM_TYPE: &str = "{70737809-852C-4A03-9E22-2CECEA5B9BFA}";
pub const TABLE_ITEM_TYPE: &str = "{CD06BC3B-789D-4C51-AAFA-A467912B8965}";
pub const CODED_DOMAIN_ITEM_TYPE: &str = "{8C368B12-A12E-4C7E-9638-C9C64E69E98F}";
pub const RELATIONSHIP_ITEM_TYPE: &str = "{B606A7E1-FA5B-439C-849C-6E9C2481537B}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredColumn {
    pub name: String,
    pub sql_type: SqlType,
    pub length: Option<u32>,
    pub nullable: bool,
    /// Feature geometry column, read through the geometry accessor.
    pub geometry: bool,
}

impl StoredColumn {
    pub fn new(name: &str, sql_type: SqlType) -> Self {
        Self {
            name: name.to_string(),
            sql_type,
            length: None,
            nullable: true,
            geometry: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTable {
    pub name: String,
    pub columns: Vec<StoredColumn>,
    #[serde(skip)]
    pub rows: Vec<Vec<Value>>,
}

impl StoredTable {
    pub fn new(name: &str, columns: Vec<StoredColumn>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Column position, exact match first, then ignoring case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim().trim_matches('"');
        self.columns
            .iter()
            .position(|c| c.name == name)
            .or_else(|| self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name)))
    }

    pub fn geometry_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.geometry)
    }

    pub fn is_system(&self) -> bool {
        self.name.eq_ignore_ascii_case(ITEMS_TABLE) || self.name.eq_ignore_ascii_case(ITEM_RELATIONSHIPS_TABLE)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodedDomain {
    pub field_type: String,
    pub coded_values: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainAssignment {
    pub table: String,
    pub column: String,
    pub domain: String,
}

/// In-memory image of one database directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoDatabase {
    pub tables: Vec<StoredTable>,
    pub domains: BTreeMap<String, CodedDomain>,
    pub relationships: BTreeMap<String, RelationshipClass>,
    pub assignments: Vec<DomainAssignment>,
}

impl GeoDatabase {
    /// Fresh database carrying the two system catalog tables.
    pub fn with_catalog() -> Self {
        let text = |name: &str| StoredColumn::new(name, SqlType::Varchar);
        let mut db = Self::default();
        db.tables.push(StoredTable::new(
            ITEMS_TABLE,
            vec![text("Name"), text("Type"), text("ItemTypeUUID"), text("Definition")],
        ));
        db.tables.push(StoredTable::new(
            ITEM_RELATIONSHIPS_TABLE,
            vec![text("OriginName"), text("DestinationName"), text("RelationshipType")],
        ));
        db
    }

    pub fn table_index(&self, name: &str) -> Option<usize> {
        let name = name.trim().trim_matches('"');
        self.tables
            .iter()
            .position(|t| t.name == name)
            .or_else(|| self.tables.iter().position(|t| t.name.eq_ignore_ascii_case(name)))
    }

    pub fn table(&self, name: &str) -> EngineResult<&StoredTable> {
        self.table_index(name)
            .map(|i| &self.tables[i])
            .ok_or_else(|| EngineError::NotFound(format!("table not found: {name}")))
    }

    pub fn table_mut(&mut self, name: &str) -> EngineResult<&mut StoredTable> {
        match self.table_index(name) {
            Some(i) => Ok(&mut self.tables[i]),
            None => Err(EngineError::NotFound(format!("table not found: {name}"))),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RowData {
    tables: BTreeMap<String, Vec<Vec<Value>>>,
}

/// Reads and writes a database directory.
pub struct DatabaseStore {
    dir: PathBuf,
}

impl DatabaseStore {
    /// Creates the directory and an empty database in it.
    pub fn create<P: AsRef<Path>>(dir: P) -> EngineResult<(Self, GeoDatabase)> {
        let dir = dir.as_ref().to_path_buf();
        if dir.join(MANIFEST_FILE).exists() {
            return Err(EngineError::AlreadyExists(format!("database already exists: {}", dir.display())));
        }
        fs::create_dir_all(&dir)?;
        let store = Self { dir };
        let db = GeoDatabase::with_catalog();
        store.save(&db)?;
        Ok((store, db))
    }

    /// Opens an existing database; a missing directory or manifest is NotFound.
    pub fn open<P: AsRef<Path>>(dir: P) -> EngineResult<(Self, GeoDatabase)> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.join(MANIFEST_FILE).is_file() {
            return Err(EngineError::NotFound(format!("database not found: {}", dir.display())));
        }
        let store = Self { dir };
        let db = store.load()?;
        Ok((store, db))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load(&self) -> EngineResult<GeoDatabase> {
        let manifest = fs::read_to_string(self.dir.join(MANIFEST_FILE))?;
        let mut db: GeoDatabase = serde_json::from_str(&manifest)
            .map_err(|e| EngineError::Internal(format!("corrupt manifest: {e}")))?;

        let rows_path = self.dir.join(ROWS_FILE);
        if rows_path.exists() {
            let data = fs::read(rows_path)?;
            let mut rows: RowData = bincode::deserialize(&data)
                .map_err(|e| EngineError::Internal(format!("corrupt row data: {e}")))?;
            for table in &mut db.tables {
                table.rows = rows.tables.remove(&table.name).unwrap_or_default();
            }
        }
        Ok(db)
    }

    /// Persists the whole database; files are replaced via rename.
    pub fn save(&self, db: &GeoDatabase) -> EngineResult<()> {
        let manifest = serde_json::to_string_pretty(db)
            .map_err(|e| EngineError::Internal(format!("manifest serialization: {e}")))?;
        let rows = RowData {
            tables: db
                .tables
                .iter()
                .map(|t| (t.name.clone(), t.rows.clone()))
                .collect(),
        };
        let encoded = bincode::serialize(&rows)
            .map_err(|e| EngineError::Internal(format!("row serialization: {e}")))?;

        self.write_replace(ROWS_FILE, &encoded)?;
        self.write_replace(MANIFEST_FILE, manifest.as_bytes())?;
        Ok(())
    }

    fn write_replace(&self, file: &str, data: &[u8]) -> EngineResult<()> {
        let tmp = self.dir.join(format!("{file}.tmp"));
        fs::write(&tmp, data)?;
        fs::rename(&tmp, self.dir.join(file))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_writes_catalog_tables() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a.gdb");
        let (_, db) = DatabaseStore::create(&dir).unwrap();
        assert!(dir.join(MANIFEST_FILE).exists());
        assert!(db.table(ITEMS_TABLE).is_ok());
        assert!(db.table("gdb_itemrelationships").is_ok());
    }

    #[test]
    fn test_create_twice_fails() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a.gdb");
        DatabaseStore::create(&dir).unwrap();
        let err = DatabaseStore::create(&dir).err().unwrap();
        assert!(matches!(err, EngineError::AlreadyExists(_)));
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = DatabaseStore::open(temp.path().join("missing.gdb")).err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rows_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a.gdb");
        let (store, mut db) = DatabaseStore::create(&dir).unwrap();
        let mut table = StoredTable::new("t", vec![StoredColumn::new("id", SqlType::Integer)]);
        table.rows.push(vec![Value::Int(7)]);
        db.tables.push(table);
        store.save(&db).unwrap();

        let (_, reopened) = DatabaseStore::open(&dir).unwrap();
        assert_eq!(reopened.table("T").unwrap().rows, vec![vec![Value::Int(7)]]);
    }
}
