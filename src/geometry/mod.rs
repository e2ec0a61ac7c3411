//! Geometry normalization on the read path.
//!
//! Geometry columns may hold canonical WKB or the engine's legacy shape
//! buffers. [`normalize_to_wkb`] turns either into little-endian WKB and
//! replaces NaN Z ordinates with zero.

pub mod sanitizer;
pub mod shape;
pub mod sniffer;

pub use sanitizer::sanitize_nan_z;
pub use shape::{Coord, Geometry};

use crate::core::Result;

// WKB geometry type codes
pub const WKB_POINT: u32 = 1;
pub const WKB_LINE_STRING: u32 = 2;
pub const WKB_POLYGON: u32 = 3;
pub const WKB_MULTI_POINT: u32 = 4;
pub const WKB_MULTI_LINE_STRING: u32 = 5;
pub const WKB_MULTI_POLYGON: u32 = 6;
pub const WKB_GEOMETRY_COLLECTION: u32 = 7;
pub const WKB_CIRCULAR_STRING: u32 = 8;
pub const WKB_COMPOUND_CURVE: u32 = 9;
pub const WKB_CURVE_POLYGON: u32 = 10;
pub const WKB_MULTI_CURVE: u32 = 11;
pub const WKB_MULTI_SURFACE: u32 = 12;
pub const WKB_POLYHEDRAL_SURFACE: u32 = 15;
pub const WKB_TIN: u32 = 16;
pub const WKB_TRIANGLE: u32 = 17;

// Extended WKB flags in the type word
pub const EWKB_Z: u32 = 0x8000_0000;
pub const EWKB_M: u32 = 0x4000_0000;
pub const EWKB_SRID: u32 = 0x2000_0000;

/// Converts a stored geometry value to canonical WKB.
///
/// WKB input passes through; legacy shape buffers are re-encoded; anything
/// else is returned unchanged. `Ok(None)` is a null shape.
pub fn normalize_to_wkb(value: &[u8]) -> Result<Option<Vec<u8>>> {
    if value.is_empty() {
        return Ok(Some(Vec::new()));
    }
    let mut wkb = if sniffer::looks_like_wkb(value) {
        value.to_vec()
    } else if sniffer::looks_like_shape(value) {
        match shape::read_shape(value)? {
            Some(geometry) => geometry.to_wkb(sniffer::shape_has_z(value)),
            None => return Ok(None),
        }
    } else {
        return Ok(Some(value.to_vec()));
    };
    sanitize_nan_z(&mut wkb)?;
    Ok(Some(wkb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_point_becomes_wkb() {
        let mut shape = 1u32.to_le_bytes().to_vec();
        shape.extend_from_slice(&2.5f64.to_le_bytes());
        shape.extend_from_slice(&(-1.0f64).to_le_bytes());

        let wkb = normalize_to_wkb(&shape).unwrap().unwrap();
        assert_eq!(wkb[0], 1);
        assert_eq!(u32::from_le_bytes(wkb[1..5].try_into().unwrap()), WKB_POINT);
        assert_eq!(f64::from_le_bytes(wkb[5..13].try_into().unwrap()), 2.5);
        assert_eq!(f64::from_le_bytes(wkb[13..21].try_into().unwrap()), -1.0);
        assert_eq!(wkb.len(), 21);
    }

    #[test]
    fn test_null_shape_is_none() {
        assert_eq!(normalize_to_wkb(&0u32.to_le_bytes()).unwrap(), None);
    }

    #[test]
    fn test_unrecognized_bytes_pass_through() {
        let raw = vec![0x7f, 0x45, 0x4c, 0x46, 0x02];
        assert_eq!(normalize_to_wkb(&raw).unwrap(), Some(raw));
    }

    #[test]
    fn test_wkb_nan_z_is_sanitized() {
        let mut wkb = vec![1];
        wkb.extend_from_slice(&(WKB_POINT | EWKB_Z).to_le_bytes());
        for v in [1.0, 2.0, f64::NAN] {
            wkb.extend_from_slice(&v.to_le_bytes());
        }
        let out = normalize_to_wkb(&wkb).unwrap().unwrap();
        assert_eq!(f64::from_le_bytes(out[21..29].try_into().unwrap()), 0.0);
    }
}
