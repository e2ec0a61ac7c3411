use thiserror::Error;

/// Failure reported by a native engine call.
///
/// The variants mirror the engine status codes; callers branch on
/// [`EngineError::is_not_found`] and [`EngineError::is_type_mismatch`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

/// Engine status classes, numbered like the engine status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    InvalidArgument = 1,
    NotFound = 2,
    Internal = 3,
    AlreadyExists = 4,
}

impl EngineError {
    #[must_use]
    pub const fn kind(&self) -> EngineErrorKind {
        match self {
            Self::InvalidArgument(_) => EngineErrorKind::InvalidArgument,
            Self::NotFound(_) => EngineErrorKind::NotFound,
            Self::Internal(_) => EngineErrorKind::Internal,
            Self::AlreadyExists(_) => EngineErrorKind::AlreadyExists,
        }
    }

    /// Status code as returned by the engine C interface.
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.kind() as i32
    }

    /// Translates a non-zero status code plus the engine's last error message.
    #[must_use]
    pub fn from_code(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            1 => Self::InvalidArgument(message),
            2 => Self::NotFound(message),
            4 => Self::AlreadyExists(message),
            _ => Self::Internal(message),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), EngineErrorKind::NotFound)
    }

    /// Typed accessors report a value of the wrong type as an invalid argument.
    #[must_use]
    pub const fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for code in 1..=4 {
            assert_eq!(EngineError::from_code(code, "x").code(), code);
        }
        assert_eq!(EngineError::from_code(99, "boom").kind(), EngineErrorKind::Internal);
    }

    #[test]
    fn test_type_mismatch_is_invalid_argument() {
        assert!(EngineError::InvalidArgument("row value is not int32".into()).is_type_mismatch());
        assert!(!EngineError::NotFound("t".into()).is_type_mismatch());
    }
}
