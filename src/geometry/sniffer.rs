//! Byte-layout detection for stored geometry values.

const SHAPE_TYPE_MASK: u32 = 0xFF;
const SHAPE_HAS_Z: u32 = 0x8000_0000;
const SHAPE_HAS_M: u32 = 0x4000_0000;

// Shape type codes
pub const SHAPE_NULL: u32 = 0;
pub const SHAPE_POINT: u32 = 1;
pub const SHAPE_POLYLINE: u32 = 3;
pub const SHAPE_POLYGON: u32 = 5;
pub const SHAPE_MULTI_POINT: u32 = 8;
pub const SHAPE_POINT_Z: u32 = 9;
pub const SHAPE_POLYLINE_Z: u32 = 10;
pub const SHAPE_POINT_ZM: u32 = 11;
pub const SHAPE_POLYLINE_ZM: u32 = 13;
pub const SHAPE_POLYGON_ZM: u32 = 15;
pub const SHAPE_MULTI_POINT_ZM: u32 = 18;
pub const SHAPE_POLYGON_Z: u32 = 19;
pub const SHAPE_MULTI_POINT_Z: u32 = 20;
pub const SHAPE_POINT_M: u32 = 21;
pub const SHAPE_POLYLINE_M: u32 = 23;
pub const SHAPE_POLYGON_M: u32 = 25;
pub const SHAPE_MULTI_POINT_M: u32 = 28;
pub const SHAPE_GENERAL_POLYLINE: u32 = 50;
pub const SHAPE_GENERAL_POLYGON: u32 = 51;
pub const SHAPE_GENERAL_POINT: u32 = 52;
pub const SHAPE_GENERAL_MULTI_POINT: u32 = 53;
pub const SHAPE_GENERAL_MULTI_PATCH: u32 = 54;

fn read_u32(value: &[u8], offset: usize, little_endian: bool) -> Option<u32> {
    let bytes: [u8; 4] = value.get(offset..offset + 4)?.try_into().ok()?;
    Some(if little_endian {
        u32::from_le_bytes(bytes)
    } else {
        u32::from_be_bytes(bytes)
    })
}

/// Full shape type word, little-endian at offset 0.
pub fn shape_type_word(value: &[u8]) -> Option<u32> {
    read_u32(value, 0, true)
}

/// Basic shape type, the low byte of the type word.
pub fn shape_type(value: &[u8]) -> Option<u32> {
    shape_type_word(value).map(|word| word & SHAPE_TYPE_MASK)
}

/// Byte order marker followed by a plausible type code.
pub fn looks_like_wkb(value: &[u8]) -> bool {
    if value.len() < 5 || value[0] > 1 {
        return false;
    }
    read_u32(value, 1, value[0] == 1).is_some_and(|word| {
        let base = (word & 0xFFFF) % 1000;
        (1..=31).contains(&base)
    })
}

pub fn looks_like_shape(value: &[u8]) -> bool {
    shape_type(value).is_some_and(|t| {
        matches!(
            t,
            SHAPE_NULL
                | SHAPE_POINT
                | SHAPE_POINT_M
                | SHAPE_POINT_ZM
                | SHAPE_POINT_Z
                | SHAPE_MULTI_POINT
                | SHAPE_MULTI_POINT_M
                | SHAPE_MULTI_POINT_ZM
                | SHAPE_MULTI_POINT_Z
                | SHAPE_POLYLINE
                | SHAPE_POLYLINE_M
                | SHAPE_POLYLINE_ZM
                | SHAPE_POLYLINE_Z
                | SHAPE_POLYGON
                | SHAPE_POLYGON_M
                | SHAPE_POLYGON_ZM
                | SHAPE_POLYGON_Z
                | SHAPE_GENERAL_POLYLINE..=SHAPE_GENERAL_MULTI_PATCH
        )
    })
}

/// Whether the shape carries Z values: fixed Z types, or a general type
/// with the Z flag set in the type word.
pub fn shape_has_z(value: &[u8]) -> bool {
    let Some(word) = shape_type_word(value) else {
        return false;
    };
    match word & SHAPE_TYPE_MASK {
        SHAPE_POINT_ZM | SHAPE_POINT_Z | SHAPE_MULTI_POINT_ZM | SHAPE_MULTI_POINT_Z | SHAPE_POLYLINE_ZM
        | SHAPE_POLYLINE_Z | SHAPE_POLYGON_ZM | SHAPE_POLYGON_Z => true,
        SHAPE_GENERAL_POLYLINE..=SHAPE_GENERAL_MULTI_PATCH => word & SHAPE_HAS_Z != 0,
        _ => false,
    }
}

/// Whether the shape carries M values.
pub fn shape_has_m(value: &[u8]) -> bool {
    let Some(word) = shape_type_word(value) else {
        return false;
    };
    match word & SHAPE_TYPE_MASK {
        SHAPE_POINT_ZM | SHAPE_POINT_M | SHAPE_MULTI_POINT_ZM | SHAPE_MULTI_POINT_M | SHAPE_POLYLINE_ZM
        | SHAPE_POLYLINE_M | SHAPE_POLYGON_ZM | SHAPE_POLYGON_M => true,
        SHAPE_GENERAL_POLYLINE..=SHAPE_GENERAL_MULTI_PATCH => word & SHAPE_HAS_M != 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wkb_point_detected() {
        let mut wkb = vec![1, 1, 0, 0, 0];
        wkb.extend_from_slice(&[0; 16]);
        assert!(looks_like_wkb(&wkb));
        let big_endian = [0, 0, 0, 0x03, 0xE9];
        assert!(looks_like_wkb(&big_endian));
    }

    #[test]
    fn test_shape_point_is_not_wkb() {
        let mut shape = vec![1, 0, 0, 0];
        shape.extend_from_slice(&[0; 16]);
        assert!(looks_like_shape(&shape));
        assert!(!looks_like_wkb(&shape));
        assert!(!shape_has_z(&shape));
    }

    #[test]
    fn test_z_flags() {
        assert!(shape_has_z(&SHAPE_POLYGON_Z.to_le_bytes()));
        assert!(shape_has_z(&SHAPE_POINT_ZM.to_le_bytes()));
        assert!(!shape_has_z(&SHAPE_POLYLINE_M.to_le_bytes()));
        assert!(shape_has_z(&(SHAPE_GENERAL_POLYGON | SHAPE_HAS_Z).to_le_bytes()));
        assert!(!shape_has_z(&SHAPE_GENERAL_POLYGON.to_le_bytes()));
        assert!(shape_has_m(&SHAPE_POINT_M.to_le_bytes()));
    }

    #[test]
    fn test_short_or_unknown_input() {
        assert!(!looks_like_wkb(&[1, 1, 0]));
        assert!(!looks_like_shape(&[1, 0]));
        assert!(!looks_like_shape(&42u32.to_le_bytes()));
    }
}
