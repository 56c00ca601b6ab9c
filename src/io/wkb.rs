//! Minimal WKB writer for polygon geometries.

use geo::{MultiPolygon, Polygon};

/// WKB geometry type for Polygon
const WKB_POLYGON: u32 = 3;
/// WKB geometry type for MultiPolygon
const WKB_MULTIPOLYGON: u32 = 6;
/// WKB byte order: little endian
const WKB_LE: u8 = 1;

fn push_ring(out: &mut Vec<u8>, ring: &geo::LineString<f64>) {
    out.extend_from_slice(&(ring.0.len() as u32).to_le_bytes());
    for coord in ring.coords() {
        out.extend_from_slice(&coord.x.to_le_bytes());
        out.extend_from_slice(&coord.y.to_le_bytes());
    }
}

fn push_polygon(out: &mut Vec<u8>, poly: &Polygon<f64>) {
    out.push(WKB_LE);
    out.extend_from_slice(&WKB_POLYGON.to_le_bytes());
    out.extend_from_slice(&((1 + poly.interiors().len()) as u32).to_le_bytes());
    push_ring(out, poly.exterior());
    for interior in poly.interiors() {
        push_ring(out, interior);
    }
}

/// Encode a multipolygon as WKB bytes.
///
/// Single-part geometries are encoded as a plain Polygon record.
pub(crate) fn multipolygon_to_wkb(mp: &MultiPolygon<f64>) -> Vec<u8> {
    let mut out = Vec::new();
    if mp.0.len() == 1 {
        push_polygon(&mut out, &mp.0[0]);
    } else {
        out.push(WKB_LE);
        out.extend_from_slice(&WKB_MULTIPOLYGON.to_le_bytes());
        out.extend_from_slice(&(mp.0.len() as u32).to_le_bytes());
        for poly in &mp.0 {
            push_polygon(&mut out, poly);
        }
    }
    out
}
