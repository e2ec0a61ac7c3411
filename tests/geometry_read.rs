// Geometry normalization on the read path: legacy shape to WKB, NaN Z repair
use fgdb_sql::geometry::{EWKB_Z, WKB_LINE_STRING, WKB_MULTI_POINT, WKB_POINT};
use fgdb_sql::parser::literal::encode_bytes;
use fgdb_sql::{Connection, ConnectionOptions, FileEngine, Value};
use tempfile::TempDir;

fn open(temp: &TempDir) -> Connection {
    let options = ConnectionOptions {
        create_if_missing: true,
        ..ConnectionOptions::default()
    };
    let conn = Connection::open(temp.path().join("geo.gdb"), Box::new(FileEngine::new()), options).unwrap();
    conn.create_statement()
        .unwrap()
        .execute_update("CREATE TABLE road (OBJECTID INTEGER, name VARCHAR(20), shape GEOMETRY)")
        .unwrap();
    conn
}

fn insert(conn: &Connection, id: i32, geometry: &[u8]) {
    let mut ps = conn.prepare_statement("INSERT INTO road VALUES (?, ?, ?)").unwrap();
    ps.set_int(1, id).unwrap();
    ps.set_string(2, &format!("road {id}")).unwrap();
    ps.set_bytes(3, geometry).unwrap();
    ps.execute_update().unwrap();
}

fn read_shape(conn: &Connection, id: i32) -> (Vec<u8>, Vec<String>) {
    let mut stmt = conn.create_statement().unwrap();
    let mut rs = stmt
        .execute_query(&format!("SELECT shape FROM road WHERE OBJECTID = {id}"))
        .unwrap();
    assert!(rs.next());
    let bytes = rs.get_bytes(1).unwrap().unwrap();
    (bytes, stmt.warnings().to_vec())
}

fn f64_at(buf: &[u8], offset: usize) -> f64 {
    f64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap())
}

fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

/// Two-point PolylineZ shape buffer.
fn polyline_z(points: &[(f64, f64, f64)]) -> Vec<u8> {
    let mut buf = 10u32.to_le_bytes().to_vec();
    buf.extend_from_slice(&[0; 32]);
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&(points.len() as u32).to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    for (x, y, _) in points {
        buf.extend_from_slice(&x.to_le_bytes());
        buf.extend_from_slice(&y.to_le_bytes());
    }
    buf.extend_from_slice(&[0; 16]);
    for (_, _, z) in points {
        buf.extend_from_slice(&z.to_le_bytes());
    }
    buf
}

/// MultiPoint (type 8) or MultiPointZ (type 20) shape buffer.
fn multipoint(points: &[(f64, f64, f64)], with_z: bool) -> Vec<u8> {
    let shape_type: u32 = if with_z { 20 } else { 8 };
    let mut buf = shape_type.to_le_bytes().to_vec();
    buf.extend_from_slice(&[0; 32]);
    buf.extend_from_slice(&(points.len() as u32).to_le_bytes());
    for (x, y, _) in points {
        buf.extend_from_slice(&x.to_le_bytes());
        buf.extend_from_slice(&y.to_le_bytes());
    }
    if with_z {
        buf.extend_from_slice(&[0; 16]);
        for (_, _, z) in points {
            buf.extend_from_slice(&z.to_le_bytes());
        }
    }
    buf
}

fn point_z_wkb(x: f64, y: f64, z: f64) -> Vec<u8> {
    let mut buf = vec![1];
    buf.extend_from_slice(&(WKB_POINT | EWKB_Z).to_le_bytes());
    for v in [x, y, z] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

#[test]
fn test_legacy_polyline_z_becomes_wkb_line_string() {
    let temp = TempDir::new().unwrap();
    let conn = open(&temp);
    insert(&conn, 1, &polyline_z(&[(1.0, 2.0, 3.0), (4.5, 5.5, 6.5)]));

    let (wkb, warnings) = read_shape(&conn, 1);
    assert!(warnings.is_empty());
    assert_eq!(wkb[0], 1);
    assert_eq!(u32_at(&wkb, 1), WKB_LINE_STRING | EWKB_Z);
    assert_eq!(u32_at(&wkb, 5), 2);
    let coords: Vec<f64> = (0..6).map(|i| f64_at(&wkb, 9 + i * 8)).collect();
    assert_eq!(coords, vec![1.0, 2.0, 3.0, 4.5, 5.5, 6.5]);
    assert_eq!(wkb.len(), 9 + 6 * 8);
}

#[test]
fn test_legacy_multipoint_becomes_wkb_multipoint() {
    let temp = TempDir::new().unwrap();
    let conn = open(&temp);
    insert(&conn, 6, &multipoint(&[(1.0, 2.0, 0.0), (3.0, 4.0, 0.0)], false));

    let (wkb, warnings) = read_shape(&conn, 6);
    assert!(warnings.is_empty());
    assert_eq!(u32_at(&wkb, 1), WKB_MULTI_POINT);
    assert_eq!(u32_at(&wkb, 5), 2);
    // Each member: byte order, type, x, y
    assert_eq!(wkb.len(), 9 + 2 * 21);
    assert_eq!(u32_at(&wkb, 10), WKB_POINT);
    assert_eq!((f64_at(&wkb, 14), f64_at(&wkb, 22)), (1.0, 2.0));
    assert_eq!(u32_at(&wkb, 31), WKB_POINT);
    assert_eq!((f64_at(&wkb, 35), f64_at(&wkb, 43)), (3.0, 4.0));
}

#[test]
fn test_legacy_multipoint_z_keeps_z_and_repairs_nan() {
    let temp = TempDir::new().unwrap();
    let conn = open(&temp);
    insert(&conn, 7, &multipoint(&[(1.0, 2.0, 5.0), (3.0, 4.0, f64::NAN)], true));

    let (wkb, _) = read_shape(&conn, 7);
    assert_eq!(u32_at(&wkb, 1), WKB_MULTI_POINT | EWKB_Z);
    assert_eq!(u32_at(&wkb, 5), 2);
    // Each member: byte order, type, x, y, z
    assert_eq!(wkb.len(), 9 + 2 * 29);
    assert_eq!(u32_at(&wkb, 10), WKB_POINT | EWKB_Z);
    let first: Vec<f64> = (0..3).map(|i| f64_at(&wkb, 14 + i * 8)).collect();
    let second: Vec<f64> = (0..3).map(|i| f64_at(&wkb, 43 + i * 8)).collect();
    assert_eq!(first, vec![1.0, 2.0, 5.0]);
    assert_eq!(second, vec![3.0, 4.0, 0.0]);
}

#[test]
fn test_nan_z_is_replaced_with_zero() {
    let temp = TempDir::new().unwrap();
    let conn = open(&temp);
    let source = point_z_wkb(7.0, 8.0, f64::NAN);
    insert(&conn, 2, &source);

    let (wkb, _) = read_shape(&conn, 2);
    assert_eq!(wkb.len(), source.len());
    assert_eq!(&wkb[..21], &source[..21]);
    assert_eq!(f64_at(&wkb, 21), 0.0);
}

#[test]
fn test_two_dimensional_wkb_is_untouched() {
    let temp = TempDir::new().unwrap();
    let conn = open(&temp);
    let mut source = vec![1];
    source.extend_from_slice(&WKB_POINT.to_le_bytes());
    source.extend_from_slice(&f64::NAN.to_le_bytes());
    source.extend_from_slice(&2.0f64.to_le_bytes());
    insert(&conn, 3, &source);

    let (wkb, _) = read_shape(&conn, 3);
    assert_eq!(wkb, source);
}

#[test]
fn test_malformed_geometry_warns_and_returns_raw_bytes() {
    let temp = TempDir::new().unwrap();
    let conn = open(&temp);
    let broken = vec![1, 1, 0, 0, 0, 0, 0];
    insert(&conn, 4, &broken);

    let (bytes, warnings) = read_shape(&conn, 4);
    assert_eq!(bytes, broken);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("shape"));

    // The failure is local to the read; the connection keeps working
    let mut rs = conn
        .create_statement()
        .unwrap()
        .execute_query("SELECT name FROM road WHERE OBJECTID = 4")
        .unwrap();
    assert!(rs.next());
    assert_eq!(rs.get_value(1).unwrap(), Value::from("road 4"));
}

#[test]
fn test_tagged_literal_in_plain_sql() {
    let temp = TempDir::new().unwrap();
    let conn = open(&temp);
    let source = point_z_wkb(1.0, 1.0, 1.0);
    conn.create_statement()
        .unwrap()
        .execute_update(&format!("INSERT INTO road VALUES (5, 'x', '{}')", encode_bytes(&source)))
        .unwrap();
    let (wkb, _) = read_shape(&conn, 5);
    assert_eq!(wkb, source);
}
