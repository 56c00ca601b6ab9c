//! The catchment (EZG) geometry adapter.

use std::collections::BTreeMap;
use std::path::Path;

use geo::{BoundingRect, Centroid, MultiPolygon};

use crate::crs::{CoordTransform, Crs};
use crate::error::{Error, Result};
use crate::io::{multipolygon_to_wkb, multipolygon_to_wkt};
use crate::provider::StationQuery;
use crate::vector::{self, Feature, PropertyValue};

/// Picks one feature out of a vector dataset.
#[derive(Debug, Clone)]
pub enum Selector {
    /// Positional index into the dataset's feature sequence.
    Index(usize),
    /// First feature whose property `key` equals `value`.
    Property { key: String, value: PropertyValue },
}

impl Selector {
    pub fn property(key: &str, value: impl Into<PropertyValue>) -> Self {
        Selector::Property {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

/// A single drainage-basin polygon with its CRS and feature properties.
///
/// The geometry is immutable; the CRS may be assigned once after construction
/// when the source dataset did not carry one.
#[derive(Debug, Clone)]
pub struct Catchment {
    geometry: MultiPolygon<f64>,
    crs: Option<Crs>,
    properties: BTreeMap<String, PropertyValue>,
}

impl Catchment {
    /// Wrap an in-memory feature.
    pub fn from_feature(feature: Feature, crs: Option<Crs>) -> Self {
        Self {
            geometry: feature.geometry,
            crs,
            properties: feature.properties,
        }
    }

    /// Load one feature of a vector dataset.
    pub fn from_file(path: &Path, selector: &Selector) -> Result<Self> {
        let dataset = vector::read_dataset(path)?;
        let crs = dataset.crs;
        let feature = match selector {
            Selector::Index(idx) => dataset.features.into_iter().nth(*idx),
            Selector::Property { key, value } => dataset
                .features
                .into_iter()
                .find(|f| f.properties.get(key) == Some(value)),
        }
        .ok_or(Error::NotFound)?;
        Ok(Self::from_feature(feature, crs))
    }

    /// Load every feature of a vector dataset as a catchment.
    pub fn all_from_file(path: &Path) -> Result<Vec<Self>> {
        let dataset = vector::read_dataset(path)?;
        let crs = dataset.crs;
        Ok(dataset
            .features
            .into_iter()
            .map(|f| Self::from_feature(f, crs.clone()))
            .collect())
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Well-known-text serialization of the geometry.
    pub fn wkt(&self) -> String {
        multipolygon_to_wkt(&self.geometry)
    }

    /// Well-known-binary serialization of the geometry.
    pub fn wkb(&self) -> Vec<u8> {
        multipolygon_to_wkb(&self.geometry)
    }

    /// The CRS, which must have been read from the dataset or assigned.
    pub fn crs(&self) -> Result<&Crs> {
        self.crs.as_ref().ok_or(Error::MissingCrs)
    }

    /// Assign the CRS. Overrides whatever the dataset carried.
    ///
    /// Accepts anything convertible to [`Crs`]: a bare integer is an EPSG
    /// code; authority strings go through [`Crs::try_from`], which rejects
    /// non-EPSG authorities.
    pub fn set_crs(&mut self, crs: impl Into<Crs>) {
        self.crs = Some(crs.into());
    }

    /// Bounding box as (min-x, min-y, max-x, max-y) in the native CRS.
    pub fn bbox(&self) -> Result<(f64, f64, f64, f64)> {
        let rect = self.geometry.bounding_rect().ok_or(Error::EmptyGeometry)?;
        Ok((rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    /// Centroid in the native CRS.
    pub fn centroid(&self) -> Result<geo::Point<f64>> {
        self.geometry.centroid().ok_or(Error::EmptyGeometry)
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// Look up a feature property by key.
    pub fn property(&self, key: &str) -> Result<&PropertyValue> {
        self.properties
            .get(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// Reprojected copy of the geometry, always-xy axis order.
    pub fn transform_to(&self, target: &Crs) -> Result<MultiPolygon<f64>> {
        let transform = CoordTransform::new(self.crs()?, target)?;
        transform.apply_multipolygon(&self.geometry)
    }

    /// Station lookup over the catchment's WGS84 bounding box.
    pub fn bbox_query(&self) -> Result<StationQuery> {
        let shape = self.transform_to(&Crs::WGS84)?;
        let rect = shape.bounding_rect().ok_or(Error::EmptyGeometry)?;
        Ok(StationQuery::Bbox {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        })
    }

    /// Station lookup around the WGS84 centroid within `km`.
    pub fn distance_query(&self, km: f64) -> Result<StationQuery> {
        let (longitude, latitude) = self.centroid_wgs84()?;
        Ok(StationQuery::Distance {
            longitude,
            latitude,
            km,
        })
    }

    /// Station lookup for the `count` closest stations to the WGS84 centroid.
    pub fn rank_query(&self, count: usize) -> Result<StationQuery> {
        let (longitude, latitude) = self.centroid_wgs84()?;
        Ok(StationQuery::Rank {
            longitude,
            latitude,
            count,
        })
    }

    fn centroid_wgs84(&self) -> Result<(f64, f64)> {
        let centroid = self.centroid()?;
        let transform = CoordTransform::new(self.crs()?, &Crs::WGS84)?;
        transform.apply(centroid.x(), centroid.y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn test_catchment(crs: Option<Crs>) -> Catchment {
        let mut properties = BTreeMap::new();
        properties.insert("FG_ID".to_string(), PropertyValue::Int(17));
        properties.insert(
            "LANGNAME".to_string(),
            PropertyValue::String("Testbach".to_string()),
        );
        Catchment::from_feature(
            Feature {
                geometry: MultiPolygon(vec![polygon![
                    (x: 6.0, y: 49.0),
                    (x: 6.5, y: 49.0),
                    (x: 6.5, y: 49.5),
                    (x: 6.0, y: 49.5),
                ]]),
                properties,
            },
            crs,
        )
    }

    #[test]
    fn bbox_and_centroid() {
        let ezg = test_catchment(Some(Crs::WGS84));
        assert_eq!(ezg.bbox().unwrap(), (6.0, 49.0, 6.5, 49.5));
        let c = ezg.centroid().unwrap();
        assert!((c.x() - 6.25).abs() < 1e-9);
        assert!((c.y() - 49.25).abs() < 1e-9);
    }

    #[test]
    fn property_lookup() {
        let ezg = test_catchment(None);
        assert_eq!(ezg.property("FG_ID").unwrap(), &PropertyValue::Int(17));
        assert!(matches!(
            ezg.property("MISSING"),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn transform_without_crs_fails() {
        let ezg = test_catchment(None);
        assert!(matches!(ezg.transform_to(&Crs::WGS84), Err(Error::MissingCrs)));
        assert!(matches!(ezg.bbox_query(), Err(Error::MissingCrs)));
    }

    #[test]
    fn crs_assignment_from_int_and_string_agree() {
        let mut a = test_catchment(None);
        let mut b = test_catchment(None);
        a.set_crs(31467u32);
        b.set_crs(Crs::try_from("EPSG:31467").unwrap());
        assert_eq!(a.crs().unwrap(), b.crs().unwrap());
    }

    #[test]
    fn identity_reprojection_keeps_coordinates() {
        let ezg = test_catchment(Some(Crs::WGS84));
        let shape = ezg.transform_to(&Crs::WGS84).unwrap();
        for (a, b) in ezg.geometry().0[0]
            .exterior()
            .coords()
            .zip(shape.0[0].exterior().coords())
        {
            assert!((a.x - b.x).abs() < 1e-9);
            assert!((a.y - b.y).abs() < 1e-9);
        }
    }

    #[test]
    fn bbox_query_is_in_wgs84() {
        let ezg = test_catchment(Some(Crs::WGS84));
        match ezg.bbox_query().unwrap() {
            StationQuery::Bbox {
                min_x,
                min_y,
                max_x,
                max_y,
            } => {
                assert!((min_x - 6.0).abs() < 1e-9);
                assert!((min_y - 49.0).abs() < 1e-9);
                assert!((max_x - 6.5).abs() < 1e-9);
                assert!((max_y - 49.5).abs() < 1e-9);
            }
            other => panic!("expected bbox query, got {other:?}"),
        }
    }

    #[test]
    fn wkt_and_wkb_round_the_same_geometry() {
        let ezg = test_catchment(Some(Crs::WGS84));
        assert!(ezg.wkt().starts_with("POLYGON (("));
        assert_eq!(ezg.wkb()[0], 1); // little endian marker
    }
}
