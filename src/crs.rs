//! Coordinate reference systems and always-xy coordinate transforms.

use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::{Error, Result};

/// A coordinate reference system.
///
/// User-supplied systems are restricted to the EPSG authority; raw PROJ
/// definitions exist for grids that carry a non-registry projection, such as
/// the RADOLAN polar stereographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crs {
    Epsg(u32),
    Custom { name: String, definition: String },
}

impl Crs {
    /// The WGS84 geographic CRS every station lookup runs in.
    pub const WGS84: Crs = Crs::Epsg(4326);

    pub fn custom(name: &str, definition: &str) -> Self {
        Crs::Custom {
            name: name.to_string(),
            definition: definition.to_string(),
        }
    }

    /// PROJ.4 definition string for this CRS.
    ///
    /// EPSG codes are resolved against a built-in table covering the systems
    /// this domain meets (global geographic/mercator, ETRS89 UTM, DHDN
    /// Gauss-Krüger). An unknown code is an error, never a guess.
    pub fn proj_def(&self) -> Result<&str> {
        match self {
            Crs::Custom { definition, .. } => Ok(definition),
            Crs::Epsg(code) => match code {
                4326 => Ok("+proj=longlat +datum=WGS84 +no_defs"),
                4258 => Ok("+proj=longlat +ellps=GRS80 +no_defs"),
                3857 => Ok(
                    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 \
                     +units=m +nadgrids=@null +no_defs",
                ),
                25832 => Ok("+proj=utm +zone=32 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"),
                25833 => Ok("+proj=utm +zone=33 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"),
                32632 => Ok("+proj=utm +zone=32 +datum=WGS84 +units=m +no_defs"),
                32633 => Ok("+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs"),
                // DHDN / 3-degree Gauss-Krüger zones 2-5
                31466 => Ok(GK_ZONE_2),
                31467 => Ok(GK_ZONE_3),
                31468 => Ok(GK_ZONE_4),
                31469 => Ok(GK_ZONE_5),
                other => Err(Error::UnknownEpsg(*other)),
            },
        }
    }

    fn to_proj(&self) -> Result<Proj> {
        Ok(Proj::from_proj_string(self.proj_def()?)?)
    }
}

const GK_ZONE_2: &str = "+proj=tmerc +lat_0=0 +lon_0=6 +k=1 +x_0=2500000 +y_0=0 +ellps=bessel \
     +towgs84=598.1,73.7,418.2,0.202,0.045,-2.455,6.7 +units=m +no_defs";
const GK_ZONE_3: &str = "+proj=tmerc +lat_0=0 +lon_0=9 +k=1 +x_0=3500000 +y_0=0 +ellps=bessel \
     +towgs84=598.1,73.7,418.2,0.202,0.045,-2.455,6.7 +units=m +no_defs";
const GK_ZONE_4: &str = "+proj=tmerc +lat_0=0 +lon_0=12 +k=1 +x_0=4500000 +y_0=0 +ellps=bessel \
     +towgs84=598.1,73.7,418.2,0.202,0.045,-2.455,6.7 +units=m +no_defs";
const GK_ZONE_5: &str = "+proj=tmerc +lat_0=0 +lon_0=15 +k=1 +x_0=5500000 +y_0=0 +ellps=bessel \
     +towgs84=598.1,73.7,418.2,0.202,0.045,-2.455,6.7 +units=m +no_defs";

impl From<u32> for Crs {
    /// A bare integer is always read as an EPSG code.
    fn from(code: u32) -> Self {
        Crs::Epsg(code)
    }
}

impl TryFrom<&str> for Crs {
    type Error = Error;

    /// Parse an `authority:code` string. Only the EPSG authority is allowed.
    fn try_from(value: &str) -> Result<Self> {
        let (authority, code) = value
            .split_once(':')
            .ok_or_else(|| Error::UnsupportedCrs(value.to_string()))?;
        if !authority.eq_ignore_ascii_case("epsg") {
            return Err(Error::UnsupportedCrs(value.to_string()));
        }
        let code: u32 = code
            .trim()
            .parse()
            .map_err(|_| Error::UnsupportedCrs(value.to_string()))?;
        Ok(Crs::Epsg(code))
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{code}"),
            Crs::Custom { name, .. } => write!(f, "{name}"),
        }
    }
}

/// A one-way coordinate transform with always-xy axis order.
///
/// proj4rs works in radians for geographic systems, so degree conversion is
/// applied on the geographic side of the transform.
pub struct CoordTransform {
    src: Proj,
    dst: Proj,
}

impl CoordTransform {
    pub fn new(src: &Crs, dst: &Crs) -> Result<Self> {
        Ok(Self {
            src: src.to_proj()?,
            dst: dst.to_proj()?,
        })
    }

    /// Transform a single (x, y) coordinate pair.
    pub fn apply(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut point = if self.src.is_latlong() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        transform(&self.src, &self.dst, &mut point)?;
        if self.dst.is_latlong() {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }

    /// Reproject a multipolygon, allocating a new geometry.
    pub fn apply_multipolygon(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        shape.try_map_coords(|coord: Coord<f64>| {
            let (x, y) = self.apply(coord.x, coord.y)?;
            Ok(Coord { x, y })
        })
    }
}
