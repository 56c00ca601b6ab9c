//! Vector dataset reading: shapefile and GeoJSON features.
//!
//! Geometries are collapsed to planar multipolygons on the way in; any z or m
//! coordinate is dropped because every downstream primitive works in 2-D.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use log::debug;
use serde_json::Value;
use shapefile::dbase::FieldValue;
use shapefile::Shape;

use crate::crs::Crs;
use crate::error::{Error, Result};

/// One scalar feature property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    Null,
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{s}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

/// One feature of a vector dataset.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: MultiPolygon<f64>,
    pub properties: BTreeMap<String, PropertyValue>,
}

/// A fully materialized vector dataset with its dataset-level CRS, if any.
#[derive(Debug, Clone)]
pub struct VectorDataset {
    pub features: Vec<Feature>,
    pub crs: Option<Crs>,
}

/// Read a vector dataset, dispatching on the file extension.
pub fn read_dataset(path: &Path) -> Result<VectorDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "shp" => read_shapefile(path),
        "geojson" | "json" => read_geojson(path),
        _ => Err(Error::VectorFormat(path.display().to_string())),
    }
}

// ---------------------------------------------------------------------------
// Shapefile
// ---------------------------------------------------------------------------

fn read_shapefile(path: &Path) -> Result<VectorDataset> {
    let mut reader = shapefile::Reader::from_path(path)?;

    let mut features = Vec::with_capacity(reader.shape_count()?);
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        let Some(geometry) = shape_to_multipolygon(&shape) else {
            debug!("skipping non-polygon shape in {}", path.display());
            continue;
        };

        let mut properties = BTreeMap::new();
        for (name, value) in record {
            properties.insert(name, field_to_property(value));
        }
        features.push(Feature { geometry, properties });
    }

    Ok(VectorDataset {
        features,
        crs: read_prj_epsg(path),
    })
}

fn field_to_property(value: FieldValue) -> PropertyValue {
    match value {
        FieldValue::Character(Some(s)) => PropertyValue::String(s.trim().to_string()),
        FieldValue::Numeric(Some(v)) => PropertyValue::Float(v),
        FieldValue::Float(Some(v)) => PropertyValue::Float(v as f64),
        FieldValue::Integer(v) => PropertyValue::Int(v as i64),
        FieldValue::Double(v) => PropertyValue::Float(v),
        FieldValue::Logical(Some(v)) => PropertyValue::Bool(v),
        FieldValue::Date(Some(d)) => {
            PropertyValue::String(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
        }
        _ => PropertyValue::Null,
    }
}

/// Pull an EPSG code out of the `.prj` sidecar, if one is present.
///
/// WKT1 nests an `AUTHORITY["EPSG","nnnn"]` clause per sub-object; the last
/// occurrence belongs to the CRS itself.
fn read_prj_epsg(shp_path: &Path) -> Option<Crs> {
    let wkt = fs::read_to_string(shp_path.with_extension("prj")).ok()?;
    let mut code = None;
    let mut rest = wkt.as_str();
    while let Some(pos) = rest.find("AUTHORITY[\"EPSG\",\"") {
        let tail = &rest[pos + 18..];
        let end = tail.find('"')?;
        code = tail[..end].parse::<u32>().ok();
        rest = &tail[end..];
    }
    code.map(Crs::Epsg)
}

fn shape_to_multipolygon(shape: &Shape) -> Option<MultiPolygon<f64>> {
    let rings: Vec<Vec<Coord<f64>>> = match shape {
        Shape::Polygon(p) => p
            .rings()
            .iter()
            .map(|r| r.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
            .collect(),
        Shape::PolygonZ(p) => p
            .rings()
            .iter()
            .map(|r| r.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
            .collect(),
        Shape::PolygonM(p) => p
            .rings()
            .iter()
            .map(|r| r.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
            .collect(),
        _ => return None,
    };
    Some(rings_to_multipolygon(rings))
}

/// Group raw shapefile rings into polygons.
///
/// Shapefiles store rings flat, exterior first (clockwise, i.e. negative
/// signed area) followed by its holes.
pub(crate) fn rings_to_multipolygon(rings: Vec<Vec<Coord<f64>>>) -> MultiPolygon<f64> {
    fn ensure_closed(coords: &mut Vec<Coord<f64>>) {
        if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
            coords.push(coords[0]);
        }
    }

    fn signed_area(pts: &[Coord<f64>]) -> f64 {
        let mut a = 0.0;
        for w in pts.windows(2) {
            a += w[0].x * w[1].y - w[1].x * w[0].y;
        }
        a / 2.0
    }

    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for mut coords in rings {
        ensure_closed(&mut coords);
        let is_exterior = signed_area(&coords) < 0.0;
        let ring = LineString(coords);
        if is_exterior {
            if let Some(ext) = exterior.take() {
                polys.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(ring);
        } else {
            holes.push(ring);
        }
    }
    if let Some(ext) = exterior {
        polys.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polys)
}

// ---------------------------------------------------------------------------
// GeoJSON
// ---------------------------------------------------------------------------

fn read_geojson(path: &Path) -> Result<VectorDataset> {
    let text = fs::read_to_string(path)?;
    let root: Value = serde_json::from_str(&text)?;

    let mut features = Vec::new();
    match root.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            for feature in root
                .get("features")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                if let Some(f) = json_feature(feature) {
                    features.push(f);
                }
            }
        }
        Some("Feature") => {
            if let Some(f) = json_feature(&root) {
                features.push(f);
            }
        }
        _ => return Err(Error::VectorFormat(path.display().to_string())),
    }

    Ok(VectorDataset {
        features,
        crs: Some(geojson_crs(&root)),
    })
}

/// GeoJSON defaults to WGS84; the legacy `crs` member may override it.
fn geojson_crs(root: &Value) -> Crs {
    let name = root
        .pointer("/crs/properties/name")
        .and_then(Value::as_str)
        .unwrap_or("");
    // both "EPSG:31467" and "urn:ogc:def:crs:EPSG::31467" end in the code
    if let Some(code) = name
        .rsplit(':')
        .next()
        .and_then(|c| c.parse::<u32>().ok())
    {
        if name.to_ascii_uppercase().contains("EPSG") {
            return Crs::Epsg(code);
        }
    }
    Crs::Epsg(4326)
}

fn json_feature(feature: &Value) -> Option<Feature> {
    let geometry = json_geometry(feature.get("geometry")?)?;
    let mut properties = BTreeMap::new();
    if let Some(obj) = feature.get("properties").and_then(Value::as_object) {
        for (key, value) in obj {
            properties.insert(key.clone(), json_property(value));
        }
    }
    Some(Feature { geometry, properties })
}

fn json_property(value: &Value) -> PropertyValue {
    match value {
        Value::String(s) => PropertyValue::String(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => PropertyValue::Int(i),
            None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::Bool(b) => PropertyValue::Bool(*b),
        _ => PropertyValue::Null,
    }
}

fn json_geometry(geometry: &Value) -> Option<MultiPolygon<f64>> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type").and_then(Value::as_str)? {
        "Polygon" => Some(MultiPolygon(vec![json_polygon(coordinates)?])),
        "MultiPolygon" => {
            let polys: Option<Vec<_>> = coordinates
                .as_array()?
                .iter()
                .map(json_polygon)
                .collect();
            Some(MultiPolygon(polys?))
        }
        _ => None,
    }
}

fn json_polygon(rings: &Value) -> Option<Polygon<f64>> {
    let mut lines: Vec<LineString<f64>> = Vec::new();
    for ring in rings.as_array()? {
        let coords: Option<Vec<Coord<f64>>> = ring
            .as_array()?
            .iter()
            .map(|pos| {
                let pos = pos.as_array()?;
                // positions may carry an elevation; keep x/y only
                Some(Coord {
                    x: pos.first()?.as_f64()?,
                    y: pos.get(1)?.as_f64()?,
                })
            })
            .collect();
        lines.push(LineString(coords?));
    }
    let exterior = if lines.is_empty() {
        return None;
    } else {
        lines.remove(0)
    };
    Some(Polygon::new(exterior, lines))
}
