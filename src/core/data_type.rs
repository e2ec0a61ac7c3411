use serde::{Deserialize, Serialize};

/// Canonical column type set exposed through result metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SqlType {
    // Numeric types
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Boolean,
    // Date/Time types
    Date,
    Time,
    Timestamp,
    // Binary types
    VarBinary,
    Blob,
    // Character types
    Varchar,
}

impl SqlType {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::SmallInt | Self::Integer | Self::BigInt | Self::Real | Self::Double | Self::Decimal
        )
    }

    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::VarBinary | Self::Blob)
    }

    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::SmallInt | Self::Integer | Self::BigInt)
    }

    /// Standard SQL CLI type code reported as `DATA_TYPE` in metadata.
    #[must_use]
    pub const fn type_code(self) -> i32 {
        match self {
            Self::SmallInt => 5,
            Self::Integer => 4,
            Self::BigInt => -5,
            Self::Real => 7,
            Self::Double => 8,
            Self::Decimal => 3,
            Self::Boolean => 16,
            Self::Date => 91,
            Self::Time => 92,
            Self::Timestamp => 93,
            Self::VarBinary => -3,
            Self::Blob => 2004,
            Self::Varchar => 12,
        }
    }

    /// SQL keyword for the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::VarBinary => "VARBINARY",
            Self::Blob => "BLOB",
            Self::Varchar => "VARCHAR",
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
