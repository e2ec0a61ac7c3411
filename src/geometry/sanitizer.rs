//! In-place NaN Z repair for WKB buffers.
//!
//! Walks the geometry tree with a bounds-checked cursor and rewrites every
//! NaN Z ordinate to `0.0`, keeping the buffer's byte order. All other bytes
//! are left untouched.

use super::*;
use crate::core::{FgdbError, Result};

/// Deepest nesting of multi/collection members accepted before giving up.
pub const MAX_NESTING_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy)]
struct TypeInfo {
    base: u32,
    has_z: bool,
    has_m: bool,
    has_srid: bool,
}

impl TypeInfo {
    /// Decodes ISO (`+1000/+2000/+3000`) and extended (flag bit) dimensions.
    fn from_word(word: u32) -> Self {
        let simple = word & 0xFFFF;
        let base = simple % 1000;
        let iso = simple - base;
        Self {
            base,
            has_z: word & EWKB_Z != 0 || iso == 1000 || iso == 3000,
            has_m: word & EWKB_M != 0 || iso == 2000 || iso == 3000,
            has_srid: word & EWKB_SRID != 0,
        }
    }
}

struct Cursor<'a> {
    wkb: &'a mut [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn ensure(&self, n: usize, what: &str) -> Result<()> {
        if self.wkb.len() - self.offset < n {
            return Err(FgdbError::GeometryDecode(format!(
                "invalid WKB: unexpected end while reading {what} at byte {}",
                self.offset
            )));
        }
        Ok(())
    }

    fn skip(&mut self, n: usize, what: &str) -> Result<()> {
        self.ensure(n, what)?;
        self.offset += n;
        Ok(())
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        self.ensure(1, what)?;
        let b = self.wkb[self.offset];
        self.offset += 1;
        Ok(b)
    }

    fn word(&mut self, little_endian: bool, what: &str) -> Result<[u8; 4]> {
        self.ensure(4, what)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.wkb[self.offset..self.offset + 4]);
        self.offset += 4;
        if !little_endian {
            bytes.reverse();
        }
        Ok(bytes)
    }

    fn u32(&mut self, little_endian: bool, what: &str) -> Result<u32> {
        self.word(little_endian, what).map(u32::from_le_bytes)
    }

    fn count(&mut self, little_endian: bool, what: &str) -> Result<usize> {
        let value = self.word(little_endian, what).map(i32::from_le_bytes)?;
        usize::try_from(value).map_err(|_| {
            FgdbError::GeometryDecode(format!("invalid WKB {what} {value} at byte {}", self.offset - 4))
        })
    }

    fn z_ordinate(&mut self, little_endian: bool) -> Result<()> {
        self.ensure(8, "Z ordinate")?;
        let slot = &mut self.wkb[self.offset..self.offset + 8];
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(slot);
        let z = if little_endian {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        };
        if z.is_nan() {
            let zero = if little_endian {
                0.0f64.to_le_bytes()
            } else {
                0.0f64.to_be_bytes()
            };
            slot.copy_from_slice(&zero);
        }
        self.offset += 8;
        Ok(())
    }

    fn coordinate(&mut self, little_endian: bool, info: TypeInfo) -> Result<()> {
        self.skip(16, "XY ordinates")?;
        if info.has_z {
            self.z_ordinate(little_endian)?;
        }
        if info.has_m {
            self.skip(8, "M ordinate")?;
        }
        Ok(())
    }

    fn sequence(&mut self, little_endian: bool, info: TypeInfo, what: &str) -> Result<()> {
        let points = self.count(little_endian, what)?;
        for _ in 0..points {
            self.coordinate(little_endian, info)?;
        }
        Ok(())
    }

    fn geometry(&mut self, depth: usize) -> Result<()> {
        let start = self.offset;
        if depth > MAX_NESTING_DEPTH {
            return Err(FgdbError::GeometryDecode(format!(
                "invalid WKB: geometry nested deeper than {MAX_NESTING_DEPTH} levels at byte {start}"
            )));
        }
        let order = self.u8("byte order")?;
        if order > 1 {
            return Err(FgdbError::GeometryDecode(format!(
                "invalid WKB byte order {order} at byte {start}"
            )));
        }
        let le = order == 1;
        let info = TypeInfo::from_word(self.u32(le, "geometry type")?);
        if info.has_srid {
            self.skip(4, "SRID")?;
        }

        match info.base {
            WKB_POINT => self.coordinate(le, info),
            WKB_LINE_STRING | WKB_CIRCULAR_STRING => self.sequence(le, info, "point count"),
            WKB_POLYGON | WKB_TRIANGLE => {
                let rings = self.count(le, "ring count")?;
                for _ in 0..rings {
                    self.sequence(le, info, "ring point count")?;
                }
                Ok(())
            }
            WKB_MULTI_POINT | WKB_MULTI_LINE_STRING | WKB_MULTI_POLYGON | WKB_GEOMETRY_COLLECTION
            | WKB_COMPOUND_CURVE | WKB_CURVE_POLYGON | WKB_MULTI_CURVE | WKB_MULTI_SURFACE
            | WKB_POLYHEDRAL_SURFACE | WKB_TIN => {
                let members = self.count(le, "nested geometry count")?;
                for _ in 0..members {
                    self.geometry(depth + 1)?;
                }
                Ok(())
            }
            other => Err(FgdbError::GeometryDecode(format!(
                "unsupported WKB geometry type {other} at byte {start}"
            ))),
        }
    }
}

/// Rewrites NaN Z ordinates of `wkb` to zero in place.
///
/// Fails on truncated input, a bad byte order, an unknown geometry type or
/// trailing bytes after the geometry. An empty buffer is left alone.
pub fn sanitize_nan_z(wkb: &mut [u8]) -> Result<()> {
    if wkb.is_empty() {
        return Ok(());
    }
    let mut cursor = Cursor { wkb, offset: 0 };
    cursor.geometry(0)?;
    if cursor.offset != cursor.wkb.len() {
        return Err(FgdbError::GeometryDecode(format!(
            "invalid WKB: trailing bytes after geometry at byte {}",
            cursor.offset
        )));
    }
    Ok(())
}
