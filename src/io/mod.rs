//! Output serialization: CSV tables, GeoJSON features, WKT/WKB geometries.

mod csv;
mod geojson;
mod wkb;
mod wkt;

pub use csv::write_csv;
pub use geojson::{catchment_to_feature, write_geojson};
pub(crate) use wkb::multipolygon_to_wkb;
pub(crate) use wkt::multipolygon_to_wkt;
