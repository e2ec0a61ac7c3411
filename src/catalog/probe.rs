//! Typed value probes over the engine row accessors.
//!
//! The engine reports a value of the wrong type as an invalid-argument
//! error. A probe turns exactly that case into `Ok(None)` so callers can try
//! the next accessor; every other engine failure stays an error.

use crate::core::{SqlType, Value};
use crate::engine::{EngineResult, NativeEngine, RowHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Blob,
    Int32,
    Double,
    String,
}

/// Order in which unresolved columns are probed.
pub const PROBE_ORDER: [Probe; 4] = [Probe::Blob, Probe::Int32, Probe::Double, Probe::String];

impl Probe {
    #[must_use]
    pub const fn sql_type(self) -> SqlType {
        match self {
            Self::Blob => SqlType::VarBinary,
            Self::Int32 => SqlType::Integer,
            Self::Double => SqlType::Double,
            Self::String => SqlType::Varchar,
        }
    }
}

fn mismatch_to_none<T>(result: EngineResult<Option<T>>, wrap: impl FnOnce(T) -> Value) -> EngineResult<Option<Value>> {
    match result {
        Ok(Some(v)) => Ok(Some(wrap(v))),
        Ok(None) => Ok(Some(Value::Null)),
        Err(e) if e.is_type_mismatch() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Reads `column` through one typed accessor.
///
/// `Ok(None)`: the value is not of the probed type.
/// `Ok(Some(Value::Null))`: the value is null.
pub fn probe(engine: &dyn NativeEngine, row: RowHandle, column: &str, probe: Probe) -> EngineResult<Option<Value>> {
    match probe {
        Probe::Blob => mismatch_to_none(engine.row_get_blob(row, column), Value::Bytes),
        Probe::Int32 => mismatch_to_none(engine.row_get_int32(row, column), Value::Int),
        Probe::Double => mismatch_to_none(engine.row_get_double(row, column), Value::Double),
        Probe::String => mismatch_to_none(engine.row_get_string(row, column), Value::Text),
    }
}

/// First probe in [`PROBE_ORDER`] that accepts the value, with the value read.
pub fn probe_first(engine: &dyn NativeEngine, row: RowHandle, column: &str) -> EngineResult<Option<(Probe, Value)>> {
    for p in PROBE_ORDER {
        if let Some(value) = probe(engine, row, column, p)? {
            return Ok(Some((p, value)));
        }
    }
    Ok(None)
}
