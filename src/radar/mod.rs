//! Radar request fingerprinting and the memoized raster stack.

mod cache;
mod request;

pub use cache::RadarCache;
pub use request::{
    RadarParameter, RadarPeriod, RadarRequest, RadarRequestUpdate, RadarResolution,
};
