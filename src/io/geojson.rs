use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use geo::{LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};

use crate::catchment::Catchment;
use crate::vector::PropertyValue;

/// Serialize a catchment as a single GeoJSON feature.
pub fn catchment_to_feature(catchment: &Catchment) -> Value {
    let mut properties = Map::new();
    for (key, value) in catchment.properties() {
        properties.insert(key.clone(), property_to_json(value));
    }
    json!({
        "type": "Feature",
        "properties": Value::Object(properties),
        "geometry": geometry_to_json(catchment.geometry()),
    })
}

/// Write a catchment to a GeoJSON file.
pub fn write_geojson(catchment: &Catchment, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create GeoJSON file: {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &catchment_to_feature(catchment))
        .with_context(|| format!("Failed to write GeoJSON to {}", path.display()))
}

fn property_to_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::String(s) => json!(s),
        PropertyValue::Float(v) => json!(v),
        PropertyValue::Int(v) => json!(v),
        PropertyValue::Bool(v) => json!(v),
        PropertyValue::Null => Value::Null,
    }
}

fn geometry_to_json(mp: &MultiPolygon<f64>) -> Value {
    if mp.0.len() == 1 {
        json!({ "type": "Polygon", "coordinates": polygon_coords(&mp.0[0]) })
    } else {
        let coords: Vec<Value> = mp.0.iter().map(polygon_coords).collect();
        json!({ "type": "MultiPolygon", "coordinates": coords })
    }
}

fn polygon_coords(poly: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_coords(poly.exterior())];
    rings.extend(poly.interiors().iter().map(ring_coords));
    Value::Array(rings)
}

fn ring_coords(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::vector::Feature;
    use geo::polygon;
    use std::collections::BTreeMap;

    #[test]
    fn feature_carries_properties_and_geometry() {
        let mut properties = BTreeMap::new();
        properties.insert("LANGNAME".to_string(), PropertyValue::String("Testbach".into()));
        let ezg = Catchment::from_feature(
            Feature {
                geometry: MultiPolygon(vec![polygon![
                    (x: 6.0, y: 49.0), (x: 6.5, y: 49.0), (x: 6.5, y: 49.5), (x: 6.0, y: 49.0),
                ]]),
                properties,
            },
            Some(Crs::WGS84),
        );
        let feature = catchment_to_feature(&ezg);
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["properties"]["LANGNAME"], "Testbach");
        assert_eq!(feature["geometry"]["type"], "Polygon");
        let ring = feature["geometry"]["coordinates"][0].as_array().unwrap();
        assert_eq!(ring[0], json!([6.0, 49.0]));
    }
}
