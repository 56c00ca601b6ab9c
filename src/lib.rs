#![doc = "Per-catchment (EZG) hydro-meteorological dataset builder"]
mod catchment;
mod crs;
mod error;
mod io;
mod pipeline;
mod provider;
mod radar;
mod raster;
mod reduce;
mod vector;

#[doc(inline)]
pub use catchment::{Catchment, Selector};

#[doc(inline)]
pub use crs::{CoordTransform, Crs};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use io::{catchment_to_feature, write_csv, write_geojson};

#[doc(inline)]
pub use pipeline::{run, BuildConfig, IfExists};

#[doc(inline)]
pub use provider::{
    ObservationDataset, ObservationPeriod, ObservationRequest, ObservationResolution, RadarItem,
    RadarProvider, RadarScan, ScanMetadata, StationProvider, StationQuery, StationRecord,
    StationSeries,
};

#[doc(inline)]
pub use radar::{
    RadarCache, RadarParameter, RadarPeriod, RadarRequest, RadarRequestUpdate, RadarResolution,
};

#[doc(inline)]
pub use raster::{clip_to_catchment, GridTransform, MaskedGrid, Raster};

#[doc(inline)]
pub use reduce::{spatial_reduce, transpose_station_data, Statistic, VariableSelection};

#[doc(inline)]
pub use vector::{read_dataset, Feature, PropertyValue, VectorDataset};
