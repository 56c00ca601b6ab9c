//! Gridded rasters, polygon clipping, and masked arrays.

mod clip;
mod grid;
mod masked;

pub use clip::clip_to_catchment;
pub use grid::{radolan_crs, radolan_transform, GridTransform, Raster, RADOLAN_PROJ};
pub use masked::MaskedGrid;
