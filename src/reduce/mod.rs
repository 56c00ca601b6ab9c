//! Reduction of clipped rasters and station records into tidy tables.

mod radar;
mod station;

pub use radar::{spatial_reduce, Statistic};
pub use station::{transpose_station_data, VariableSelection};
