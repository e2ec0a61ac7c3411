//! Legacy shape buffer decoding and WKB encoding.
//!
//! Shape layouts (all little-endian, after the 4-byte type word):
//! - point: x, y, then z for Z types
//! - multipoint: bbox, count, xy pairs, then z range and z values
//! - polyline/polygon: bbox, part count, point count, part starts, xy pairs,
//!   then z range and z values
//!
//! M values are skipped; they are never part of the canonical output.

use bytes::{Buf, BufMut, BytesMut};

use super::sniffer::{self, *};
use super::{EWKB_Z, WKB_LINE_STRING, WKB_MULTI_LINE_STRING, WKB_MULTI_POINT, WKB_MULTI_POLYGON, WKB_POINT, WKB_POLYGON};
use crate::core::{FgdbError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord {
    #[must_use]
    pub const fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }
}

pub type Ring = Vec<Coord>;

/// Geometry object model shared by the shape reader and the WKB writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    /// Exterior ring first, then holes.
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

fn decode_error(message: impl Into<String>) -> FgdbError {
    FgdbError::GeometryDecode(message.into())
}

/// Bounds-checked little-endian reader over a shape buffer.
struct ShapeReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> ShapeReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, len: buf.len() }
    }

    fn offset(&self) -> usize {
        self.len - self.buf.remaining()
    }

    fn ensure(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(decode_error(format!(
                "invalid shape: unexpected end while reading {what} at byte {}",
                self.offset()
            )));
        }
        Ok(())
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        self.ensure(4, what)?;
        Ok(self.buf.get_u32_le())
    }

    fn count(&mut self, what: &str) -> Result<usize> {
        self.ensure(4, what)?;
        let value = self.buf.get_i32_le();
        usize::try_from(value)
            .map_err(|_| decode_error(format!("invalid shape {what} {value} at byte {}", self.offset() - 4)))
    }

    fn f64(&mut self, what: &str) -> Result<f64> {
        self.ensure(8, what)?;
        Ok(self.buf.get_f64_le())
    }

    fn skip(&mut self, n: usize, what: &str) -> Result<()> {
        self.ensure(n, what)?;
        self.buf.advance(n);
        Ok(())
    }

    fn xy_points(&mut self, count: usize) -> Result<Vec<Coord>> {
        self.ensure(count.saturating_mul(16), "points")?;
        Ok((0..count)
            .map(|_| {
                let x = self.buf.get_f64_le();
                let y = self.buf.get_f64_le();
                Coord::xy(x, y)
            })
            .collect())
    }

    /// Z range plus one z per point.
    fn z_values(&mut self, points: &mut [Coord]) -> Result<()> {
        self.skip(16, "z range")?;
        self.ensure(points.len().saturating_mul(8), "z values")?;
        for p in points.iter_mut() {
            p.z = self.buf.get_f64_le();
        }
        Ok(())
    }
}

/// Decodes a shape buffer. `Ok(None)` for the null shape.
pub fn read_shape(value: &[u8]) -> Result<Option<Geometry>> {
    let has_z = sniffer::shape_has_z(value);
    let mut reader = ShapeReader::new(value);
    let shape_type = reader.u32("shape type")? & 0xFF;

    match shape_type {
        SHAPE_NULL => Ok(None),
        SHAPE_POINT | SHAPE_POINT_M | SHAPE_POINT_Z | SHAPE_POINT_ZM | SHAPE_GENERAL_POINT => {
            let x = reader.f64("x")?;
            let y = reader.f64("y")?;
            let z = if has_z { reader.f64("z")? } else { 0.0 };
            Ok(Some(Geometry::Point(Coord { x, y, z })))
        }
        SHAPE_MULTI_POINT | SHAPE_MULTI_POINT_M | SHAPE_MULTI_POINT_Z | SHAPE_MULTI_POINT_ZM
        | SHAPE_GENERAL_MULTI_POINT => {
            reader.skip(32, "bounding box")?;
            let count = reader.count("point count")?;
            let mut points = reader.xy_points(count)?;
            if has_z {
                reader.z_values(&mut points)?;
            }
            Ok(Some(Geometry::MultiPoint(points)))
        }
        SHAPE_POLYLINE | SHAPE_POLYLINE_M | SHAPE_POLYLINE_Z | SHAPE_POLYLINE_ZM | SHAPE_GENERAL_POLYLINE => {
            let parts = read_parts(&mut reader, has_z)?;
            Ok(Some(match parts.len() {
                1 => Geometry::LineString(parts.into_iter().flatten().collect()),
                _ => Geometry::MultiLineString(parts),
            }))
        }
        SHAPE_POLYGON | SHAPE_POLYGON_M | SHAPE_POLYGON_Z | SHAPE_POLYGON_ZM | SHAPE_GENERAL_POLYGON => {
            let mut polygons = group_rings(read_parts(&mut reader, has_z)?);
            Ok(Some(match polygons.len() {
                1 => Geometry::Polygon(polygons.remove(0)),
                _ => Geometry::MultiPolygon(polygons),
            }))
        }
        other => Err(decode_error(format!("unsupported shape type {other}"))),
    }
}

fn read_parts(reader: &mut ShapeReader<'_>, has_z: bool) -> Result<Vec<Vec<Coord>>> {
    reader.skip(32, "bounding box")?;
    let part_count = reader.count("part count")?;
    let point_count = reader.count("point count")?;
    reader.ensure(part_count.saturating_mul(4), "part index")?;
    let mut starts = Vec::with_capacity(part_count);
    for _ in 0..part_count {
        starts.push(reader.count("part index")?);
    }
    if starts.first().is_some_and(|&s| s != 0) || starts.windows(2).any(|w| w[0] > w[1]) {
        return Err(decode_error("invalid shape: part indexes out of order"));
    }
    if starts.last().is_some_and(|&s| s > point_count) {
        return Err(decode_error("invalid shape: part index beyond point count"));
    }

    let mut points = reader.xy_points(point_count)?;
    if has_z {
        reader.z_values(&mut points)?;
    }

    let mut parts = Vec::with_capacity(part_count);
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(point_count);
        parts.push(points[start..end].to_vec());
    }
    Ok(parts)
}

/// Shape outer rings run clockwise; a counter-clockwise ring is a hole of
/// the preceding outer ring.
fn is_clockwise(ring: &[Coord]) -> bool {
    let doubled_area: f64 = ring
        .windows(2)
        .map(|w| (w[1].x - w[0].x) * (w[1].y + w[0].y))
        .sum();
    doubled_area > 0.0
}

fn group_rings(rings: Vec<Ring>) -> Vec<Vec<Ring>> {
    let mut polygons: Vec<Vec<Ring>> = Vec::new();
    for ring in rings {
        match polygons.last_mut() {
            Some(polygon) if !is_clockwise(&ring) => polygon.push(ring),
            _ => polygons.push(vec![ring]),
        }
    }
    polygons
}

impl Geometry {
    /// Little-endian WKB, with Z ordinates when `has_z`.
    #[must_use]
    pub fn to_wkb(&self, has_z: bool) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.write_wkb(&mut buf, has_z);
        buf.to_vec()
    }

    fn write_wkb(&self, buf: &mut BytesMut, has_z: bool) {
        match self {
            Self::Point(c) => {
                header(buf, WKB_POINT, has_z);
                coord(buf, c, has_z);
            }
            Self::MultiPoint(points) => {
                header(buf, WKB_MULTI_POINT, has_z);
                put_count(buf, points.len());
                for p in points {
                    Self::Point(*p).write_wkb(buf, has_z);
                }
            }
            Self::LineString(points) => {
                header(buf, WKB_LINE_STRING, has_z);
                sequence(buf, points, has_z);
            }
            Self::MultiLineString(lines) => {
                header(buf, WKB_MULTI_LINE_STRING, has_z);
                put_count(buf, lines.len());
                for line in lines {
                    header(buf, WKB_LINE_STRING, has_z);
                    sequence(buf, line, has_z);
                }
            }
            Self::Polygon(rings) => {
                header(buf, WKB_POLYGON, has_z);
                polygon_body(buf, rings, has_z);
            }
            Self::MultiPolygon(polygons) => {
                header(buf, WKB_MULTI_POLYGON, has_z);
                put_count(buf, polygons.len());
                for rings in polygons {
                    header(buf, WKB_POLYGON, has_z);
                    polygon_body(buf, rings, has_z);
                }
            }
        }
    }
}

fn header(buf: &mut BytesMut, wkb_type: u32, has_z: bool) {
    buf.put_u8(1);
    buf.put_u32_le(if has_z { wkb_type | EWKB_Z } else { wkb_type });
}

fn put_count(buf: &mut BytesMut, n: usize) {
    buf.put_u32_le(n as u32);
}

fn coord(buf: &mut BytesMut, c: &Coord, has_z: bool) {
    buf.put_f64_le(c.x);
    buf.put_f64_le(c.y);
    if has_z {
        buf.put_f64_le(c.z);
    }
}

fn sequence(buf: &mut BytesMut, points: &[Coord], has_z: bool) {
    put_count(buf, points.len());
    for p in points {
        coord(buf, p, has_z);
    }
}

fn polygon_body(buf: &mut BytesMut, rings: &[Ring], has_z: bool) {
    put_count(buf, rings.len());
    for ring in rings {
        sequence(buf, ring, has_z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a polyline/polygon shape buffer.
    fn multipart_shape(shape_type: u32, parts: &[&[(f64, f64, f64)]], with_z: bool) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let total: usize = parts.iter().map(|p| p.len()).sum();
        buf.put_u32_le(shape_type);
        for _ in 0..4 {
            buf.put_f64_le(0.0);
        }
        buf.put_i32_le(parts.len() as i32);
        buf.put_i32_le(total as i32);
        let mut start = 0;
        for part in parts {
            buf.put_i32_le(start);
            start += part.len() as i32;
        }
        for (x, y, _) in parts.iter().flat_map(|p| p.iter()) {
            buf.put_f64_le(*x);
            buf.put_f64_le(*y);
        }
        if with_z {
            buf.put_f64_le(0.0);
            buf.put_f64_le(0.0);
            for (_, _, z) in parts.iter().flat_map(|p| p.iter()) {
                buf.put_f64_le(*z);
            }
        }
        buf.to_vec()
    }

    // clockwise square and a counter-clockwise hole inside it
    const OUTER: &[(f64, f64, f64)] = &[(0.0, 0.0, 1.0), (0.0, 10.0, 2.0), (10.0, 10.0, 3.0), (10.0, 0.0, 4.0), (0.0, 0.0, 1.0)];
    const HOLE: &[(f64, f64, f64)] = &[(2.0, 2.0, 0.0), (4.0, 2.0, 0.0), (4.0, 4.0, 0.0), (2.0, 4.0, 0.0), (2.0, 2.0, 0.0)];

    #[test]
    fn test_polygon_with_hole() {
        let shape = multipart_shape(SHAPE_POLYGON, &[OUTER, HOLE], false);
        match read_shape(&shape).unwrap() {
            Some(Geometry::Polygon(rings)) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0][1], Coord::xy(0.0, 10.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_two_outer_rings_make_multipolygon() {
        let shape = multipart_shape(SHAPE_POLYGON, &[OUTER, OUTER], false);
        assert!(matches!(read_shape(&shape).unwrap(), Some(Geometry::MultiPolygon(p)) if p.len() == 2));
    }

    #[test]
    fn test_polyline_z_reads_z_values() {
        let shape = multipart_shape(SHAPE_POLYLINE_Z, &[OUTER], true);
        match read_shape(&shape).unwrap() {
            Some(Geometry::LineString(points)) => {
                let zs: Vec<f64> = points.iter().map(|p| p.z).collect();
                assert_eq!(zs, vec![1.0, 2.0, 3.0, 4.0, 1.0]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_truncated_shape_fails() {
        let mut shape = multipart_shape(SHAPE_POLYLINE, &[OUTER], false);
        shape.truncate(shape.len() - 3);
        let err = read_shape(&shape).unwrap_err();
        assert!(err.to_string().contains("unexpected end while reading points"));
    }

    #[test]
    fn test_wkb_linestring_z_layout() {
        let line = Geometry::LineString(vec![Coord { x: 1.0, y: 2.0, z: 3.0 }]);
        let wkb = line.to_wkb(true);
        assert_eq!(wkb.len(), 1 + 4 + 4 + 24);
        assert_eq!(u32::from_le_bytes(wkb[1..5].try_into().unwrap()), WKB_LINE_STRING | EWKB_Z);
        assert_eq!(f64::from_le_bytes(wkb[25..33].try_into().unwrap()), 3.0);
    }

    #[test]
    fn test_multipatch_unsupported() {
        let err = read_shape(&SHAPE_GENERAL_MULTI_PATCH.to_le_bytes()).unwrap_err();
        assert!(matches!(err, FgdbError::GeometryDecode(_)));
    }
}
