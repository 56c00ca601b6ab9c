use geo::{LineString, MultiPolygon, Polygon};

/// Well-known-text form of a multipolygon.
///
/// Single-part geometries are written as `POLYGON`, everything else as
/// `MULTIPOLYGON`.
pub(crate) fn multipolygon_to_wkt(mp: &MultiPolygon<f64>) -> String {
    if mp.0.is_empty() {
        return "MULTIPOLYGON EMPTY".to_string();
    }
    if mp.0.len() == 1 {
        format!("POLYGON {}", polygon_body(&mp.0[0]))
    } else {
        let bodies: Vec<String> = mp.0.iter().map(polygon_body).collect();
        format!("MULTIPOLYGON ({})", bodies.join(", "))
    }
}

fn polygon_body(poly: &Polygon<f64>) -> String {
    let mut rings = vec![ring_body(poly.exterior())];
    rings.extend(poly.interiors().iter().map(ring_body));
    format!("({})", rings.join(", "))
}

fn ring_body(ring: &LineString<f64>) -> String {
    let coords: Vec<String> = ring.coords().map(|c| format!("{} {}", c.x, c.y)).collect();
    format!("({})", coords.join(", "))
}
