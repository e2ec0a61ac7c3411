use crate::core::{SqlType, Value};

/// Column reference, optionally qualified by a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(ColumnRef, Operand),
    NotEquals(ColumnRef, Operand),
    GreaterThan(ColumnRef, Operand),
    LessThan(ColumnRef, Operand),
    GreaterThanOrEqual(ColumnRef, Operand),
    LessThanOrEqual(ColumnRef, Operand),
    Between(ColumnRef, Value, Value),
    Like(ColumnRef, String),
    In(ColumnRef, Vec<Value>),
    IsNull(ColumnRef),
    IsNotNull(ColumnRef),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Flattens nested ANDs into their terms, left to right.
    pub fn conjuncts(&self) -> Vec<&Self> {
        match self {
            Self::And(left, right) => {
                let mut terms = left.conjuncts();
                terms.extend(right.conjuncts());
                terms
            }
            other => vec![other],
        }
    }

    /// Every column referenced by the condition, operands included.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        match self {
            Self::Equals(c, rhs)
            | Self::NotEquals(c, rhs)
            | Self::GreaterThan(c, rhs)
            | Self::LessThan(c, rhs)
            | Self::GreaterThanOrEqual(c, rhs)
            | Self::LessThanOrEqual(c, rhs) => match rhs {
                Operand::Column(other) => vec![c, other],
                Operand::Literal(_) => vec![c],
            },
            Self::Between(c, _, _) | Self::Like(c, _) | Self::In(c, _) | Self::IsNull(c) | Self::IsNotNull(c) => {
                vec![c]
            }
            Self::And(left, right) | Self::Or(left, right) => {
                let mut cols = left.columns();
                cols.extend(right.columns());
                cols
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub column: ColumnRef,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// Name the table's columns are qualified with in the statement.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountTarget {
    All,
    Column(ColumnRef),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `t.*`
    QualifiedWildcard(String),
    Column { column: ColumnRef, alias: Option<String> },
    Literal { value: Value, alias: Option<String> },
    Count { target: CountTarget, alias: Option<String> },
}

impl SelectItem {
    /// Output column label.
    pub fn label(&self) -> String {
        match self {
            Self::Wildcard => "*".to_string(),
            Self::QualifiedWildcard(q) => format!("{q}.*"),
            Self::Column { column, alias } => alias.clone().unwrap_or_else(|| column.name.clone()),
            Self::Literal { value, alias } => alias.clone().unwrap_or_else(|| value.to_string()),
            Self::Count { alias, .. } => alias.clone().unwrap_or_else(|| "count".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FromClause {
    Table(TableRef),
    SubSelect { select: Box<SelectStatement>, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub items: Vec<SelectItem>,
    pub from: FromClause,
    pub joins: Vec<JoinClause>,
    pub filter: Option<Condition>,
    pub order_by: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: SqlType,
    pub length: Option<u32>,
    pub nullable: bool,
    pub primary_key: bool,
    /// Declared as `GEOMETRY`; stored as the table's feature geometry.
    pub geometry: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        name: String,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Value>>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Value)>,
        filter: Option<Condition>,
    },
    Delete {
        from: String,
        filter: Option<Condition>,
    },
}
