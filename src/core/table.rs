use std::collections::HashMap;

use super::column::ColumnSchema;
use super::data_type::SqlType;

/// Resolved schema of one engine table. Column order follows the engine's
/// field enumeration; lookups by name ignore case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
    pub item_type_uuid: Option<String>,
    pub oid_field_name: Option<String>,
    pub shape_field_name: Option<String>,
    by_lower_name: HashMap<String, usize>,
}

impl TableSchema {
    #[must_use]
    pub fn new(
        table_name: impl Into<String>,
        columns: Vec<ColumnSchema>,
        item_type_uuid: Option<String>,
        oid_field_name: Option<String>,
        shape_field_name: Option<String>,
    ) -> Self {
        let by_lower_name = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.to_lowercase(), i))
            .collect();
        Self {
            table_name: table_name.into(),
            columns,
            item_type_uuid,
            oid_field_name,
            shape_field_name,
            by_lower_name,
        }
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.by_lower_name
            .get(&name.to_lowercase())
            .map(|&i| &self.columns[i])
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.primary_key || c.oid_column)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Output type of a column, `None` when the table has no such column.
    #[must_use]
    pub fn column_type(&self, name: &str) -> Option<(SqlType, String)> {
        self.column(name).map(|c| (c.sql_type, c.type_name.clone()))
    }
}
