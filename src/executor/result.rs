/// Materialized query results
///
/// Every SELECT shape ends as a `QueryResult`: the declared output columns
/// plus fully materialized rows keyed by output label.

use crate::catalog::type_resolver;
use crate::core::{ColumnSchema, ResultRow, SqlType, Value};

/// One declared output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    pub label: String,
    pub sql_type: SqlType,
    pub type_name: String,
}

impl OutputColumn {
    pub fn new(label: impl Into<String>, sql_type: SqlType) -> Self {
        let label = label.into();
        let type_name = type_resolver::type_name(sql_type, &label).to_string();
        Self {
            label,
            sql_type,
            type_name,
        }
    }

    /// Output column carrying a catalog column's type under `label`.
    pub fn from_schema(label: impl Into<String>, column: &ColumnSchema) -> Self {
        Self {
            label: label.into(),
            sql_type: column.sql_type,
            type_name: column.type_name.clone(),
        }
    }

    pub fn relabeled(&self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<OutputColumn>,
    pub rows: Vec<ResultRow>,
}

impl QueryResult {
    pub const fn new(columns: Vec<OutputColumn>, rows: Vec<ResultRow>) -> Self {
        Self { columns, rows }
    }

    /// Single-row, single-column `count` result.
    pub fn count(label: &str, count: u64) -> Self {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let mut row = ResultRow::new();
        row.insert(label, Value::Long(count));
        Self::new(vec![OutputColumn::new(label, SqlType::BigInt)], vec![row])
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.label == label)
            .or_else(|| self.columns.iter().position(|c| c.label.eq_ignore_ascii_case(label)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row values in declared column order.
    pub fn row_values(&self, index: usize) -> Option<Vec<Value>> {
        let labels = self.labels();
        self.rows.get(index).map(|row| row.values_for(&labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_result_shape() {
        let result = QueryResult::count("count", 3);
        assert_eq!(result.labels(), vec!["count".to_string()]);
        assert_eq!(result.columns[0].sql_type, SqlType::BigInt);
        assert_eq!(result.row_values(0), Some(vec![Value::Long(3)]));
    }

    #[test]
    fn test_geometry_label_reports_geometry_type_name() {
        assert_eq!(OutputColumn::new("shape", SqlType::VarBinary).type_name, "GEOMETRY");
        assert_eq!(OutputColumn::new("payload", SqlType::VarBinary).type_name, "VARBINARY");
    }

    #[test]
    fn test_column_index_ignores_case() {
        let result = QueryResult::new(vec![OutputColumn::new("Name", SqlType::Varchar)], Vec::new());
        assert_eq!(result.column_index("name"), Some(0));
        assert_eq!(result.column_index("other"), None);
    }
}
