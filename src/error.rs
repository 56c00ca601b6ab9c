use thiserror::Error;

/// Errors produced by the hydroharvest core.
///
/// Structural errors (bad CRS, bad selector) are fatal to the operation that
/// raised them. Per-timestamp decode failures never surface here; the radar
/// cache logs and skips them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no feature matched the selector")]
    NotFound,

    #[error("the catchment has no CRS; assign one before reprojecting")]
    MissingCrs,

    #[error("only EPSG definitions are supported, got '{0}'")]
    UnsupportedCrs(String),

    #[error("no built-in definition for EPSG:{0}")]
    UnknownEpsg(u32),

    #[error("property '{0}' not found")]
    KeyNotFound(String),

    #[error("the geometry is empty")]
    EmptyGeometry,

    #[error("grid and mask shapes differ: {data:?} vs {mask:?}")]
    MaskShape {
        data: (usize, usize),
        mask: (usize, usize),
    },

    #[error("{left} masked arrays but {right} timestamps")]
    AlignmentMismatch { left: usize, right: usize },

    #[error("unsupported vector dataset '{0}'")]
    VectorFormat(String),

    #[error("coordinate transform failed")]
    Projection(#[from] proj4rs::errors::Error),

    #[error("provider query failed")]
    Provider(#[source] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Shapefile(#[from] shapefile::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, Error>;
