//! Interfaces to the remote weather-data providers.
//!
//! The download clients themselves live outside this crate; the core only
//! fixes the shape of what they return.

use ahash::AHashMap;
use chrono::{NaiveDate, NaiveDateTime};
use ndarray::Array2;
use serde::Deserialize;
use serde_json::Value;

use crate::radar::RadarRequest;

/// Spatial selection for a station lookup, always in WGS84.
#[derive(Debug, Clone, PartialEq)]
pub enum StationQuery {
    /// All stations inside a bounding box.
    Bbox {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
    /// All stations within `km` of a center point.
    Distance {
        longitude: f64,
        latitude: f64,
        km: f64,
    },
    /// The `count` stations closest to a center point.
    Rank {
        longitude: f64,
        latitude: f64,
        count: usize,
    },
}

/// Observation dataset requested from the station provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationDataset {
    ClimateSummary,
    Precipitation,
    TemperatureAir,
}

/// Temporal resolution of station observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationResolution {
    Daily,
    Hourly,
    Minute10,
}

/// Data period (archive class) of station observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationPeriod {
    Historical,
    Recent,
    Now,
}

/// One station-data request: what to fetch, not where.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRequest {
    pub dataset: ObservationDataset,
    pub resolution: ObservationResolution,
    pub period: ObservationPeriod,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// One observation row of a station result.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub parameter: String,
    pub date: NaiveDate,
    pub value: f64,
    pub quality: Option<f64>,
}

/// The materialized result frame of one station.
#[derive(Debug, Clone)]
pub struct StationSeries {
    pub station_id: String,
    pub records: Vec<StationRecord>,
}

/// A weather-station provider client.
pub trait StationProvider {
    fn query(
        &self,
        query: &StationQuery,
        request: &ObservationRequest,
    ) -> anyhow::Result<Vec<StationSeries>>;
}

/// Per-scan metadata delivered alongside a decoded radar grid.
#[derive(Debug, Clone)]
pub struct ScanMetadata {
    pub timestamp: NaiveDateTime,
    /// No-data sentinel of this scan; read per entry, never assumed global.
    pub nodata: f64,
    pub extra: AHashMap<String, Value>,
}

/// One decoded radar acquisition: south-up grid plus metadata.
#[derive(Debug, Clone)]
pub struct RadarScan {
    pub grid: Array2<f64>,
    pub meta: ScanMetadata,
}

/// One undecoded item of a radar query result.
pub trait RadarItem {
    fn timestamp(&self) -> NaiveDateTime;

    /// Decode the raw payload. Failures here are per-timestamp and
    /// recoverable; the cache skips the item.
    fn decode(&self) -> anyhow::Result<RadarScan>;
}

/// A gridded-radar provider client.
pub trait RadarProvider {
    type Item: RadarItem;

    /// Run one query for the given request, returning items in acquisition
    /// order. A whole-request failure is fatal to the load.
    fn query(&self, request: &RadarRequest) -> anyhow::Result<Vec<Self::Item>>;
}
