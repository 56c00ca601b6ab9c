//! The per-catchment batch loop: discover catchments, fetch station and
//! radar data, reduce, and write one output directory per catchment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::{debug, info};
use polars::functions::concat_df_diagonal;
use polars::prelude::{DataFrame, SortMultipleOptions};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::catchment::Catchment;
use crate::io::{write_csv, write_geojson};
use crate::provider::{
    ObservationDataset, ObservationPeriod, ObservationRequest, ObservationResolution,
    RadarProvider, StationProvider, StationSeries,
};
use crate::radar::{RadarCache, RadarParameter, RadarPeriod, RadarRequest, RadarResolution};
use crate::raster::clip_to_catchment;
use crate::reduce::{spatial_reduce, transpose_station_data, Statistic, VariableSelection};

/// What to do when a catchment's output directory already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    #[default]
    Skip,
    Overwrite,
}

/// Settings of one pipeline invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory scanned for `*.shp` / `*.geojson` catchment datasets.
    pub ezg_dir: PathBuf,
    /// One subdirectory per catchment is created below this.
    pub output_dir: PathBuf,
    /// Radius of the centroid fallback station search.
    pub station_distance_km: f64,
    /// Station count of the rank fallback search.
    pub station_closest_n: usize,
    pub omit_quality_flag: bool,
    pub observation_dataset: ObservationDataset,
    pub observation_resolution: ObservationResolution,
    pub observation_periods: Vec<ObservationPeriod>,
    pub radar_parameter: RadarParameter,
    pub radar_resolution: RadarResolution,
    pub radar_periods: Vec<RadarPeriod>,
    /// Defaults to 2001-01-01, the start of the RADOLAN climatology.
    pub radar_start_date: Option<NaiveDateTime>,
    /// Defaults to the current day.
    pub radar_end_date: Option<NaiveDateTime>,
    pub statistics: Vec<Statistic>,
    /// Property values joined with `_` to name the output subdirectory.
    pub name_properties: Vec<String>,
    pub if_exists: IfExists,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            ezg_dir: PathBuf::from("EZG"),
            output_dir: PathBuf::from("output_data"),
            station_distance_km: 15.0,
            station_closest_n: 1,
            omit_quality_flag: true,
            observation_dataset: ObservationDataset::ClimateSummary,
            observation_resolution: ObservationResolution::Daily,
            observation_periods: vec![ObservationPeriod::Historical, ObservationPeriod::Recent],
            radar_parameter: RadarParameter::RadolanCdc,
            radar_resolution: RadarResolution::Daily,
            radar_periods: vec![RadarPeriod::Historical, RadarPeriod::Recent],
            radar_start_date: None,
            radar_end_date: None,
            statistics: vec![Statistic::Sum, Statistic::Mean],
            name_properties: vec!["FG_ID".to_string(), "LANGNAME".to_string()],
            if_exists: IfExists::Skip,
        }
    }
}

impl BuildConfig {
    fn radar_request(&self, period: RadarPeriod) -> RadarRequest {
        let end_date = self
            .radar_end_date
            .unwrap_or_else(|| Utc::now().date_naive().and_time(NaiveTime::MIN));
        let start_date = self.radar_start_date.unwrap_or_else(|| {
            NaiveDate::from_ymd_opt(2001, 1, 1)
                .unwrap_or_default()
                .and_time(NaiveTime::MIN)
        });
        RadarRequest {
            parameter: self.radar_parameter,
            resolution: self.radar_resolution,
            period,
            start_date,
            end_date,
        }
    }

    fn observation_request(&self, period: ObservationPeriod) -> ObservationRequest {
        ObservationRequest {
            dataset: self.observation_dataset,
            resolution: self.observation_resolution,
            period,
            start_date: None,
            end_date: None,
        }
    }
}

/// Run the full batch: one output directory per discovered catchment,
/// holding `{variable}.csv`, `radolan.csv`, and `ezg.geojson`.
pub fn run<S, R>(config: &BuildConfig, stations: &S, radar: &R) -> Result<()>
where
    S: StationProvider,
    R: RadarProvider,
{
    let catchments = discover_catchments(&config.ezg_dir)?;
    info!("found {} catchments under {}", catchments.len(), config.ezg_dir.display());

    // hot-load one cache per period so the per-catchment loop only clips
    let mut caches = Vec::new();
    for period in &config.radar_periods {
        let mut cache = RadarCache::new(config.radar_request(*period));
        cache
            .load(radar)
            .with_context(|| format!("failed to load {} radar data", period.as_str()))?;
        caches.push(cache);
    }

    for (index, ezg) in catchments.iter().enumerate() {
        let name = directory_name(ezg, index, &config.name_properties);
        let target = config.output_dir.join(&name);
        if target.exists() && config.if_exists == IfExists::Skip {
            info!("skipping {name}: output directory exists");
            continue;
        }
        fs::create_dir_all(&target)
            .with_context(|| format!("failed to create {}", target.display()))?;

        process_catchment(config, ezg, &target, stations, &caches)
            .with_context(|| format!("failed to build dataset for {name}"))?;
    }
    Ok(())
}

/// Every catchment feature of every vector dataset under `dir`.
fn discover_catchments(dir: &Path) -> Result<Vec<Catchment>> {
    let mut catchments = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_vector = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("shp") || ext.eq_ignore_ascii_case("geojson"));
        if !is_vector {
            continue;
        }
        let features = Catchment::all_from_file(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        catchments.extend(features);
    }
    Ok(catchments)
}

/// Join the configured property values with `_`; a missing property falls
/// back to the positional `EZG_{n}` label.
fn directory_name(ezg: &Catchment, index: usize, properties: &[String]) -> String {
    properties
        .iter()
        .map(|key| match ezg.properties().get(key) {
            Some(value) => value.to_string(),
            None => format!("EZG_{}", index + 1),
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn process_catchment<S: StationProvider>(
    config: &BuildConfig,
    ezg: &Catchment,
    target: &Path,
    stations: &S,
    caches: &[RadarCache],
) -> Result<()> {
    write_station_tables(config, ezg, target, stations)?;
    write_radar_table(config, ezg, target, caches)?;
    write_geojson(ezg, &target.join("ezg.geojson"))?;
    Ok(())
}

fn write_station_tables<S: StationProvider>(
    config: &BuildConfig,
    ezg: &Catchment,
    target: &Path,
    stations: &S,
) -> Result<()> {
    let mut accumulated: BTreeMap<String, Vec<DataFrame>> = BTreeMap::new();
    for period in &config.observation_periods {
        let request = config.observation_request(*period);
        let series = query_with_fallback(config, ezg, stations, &request)?;
        let tidy = transpose_station_data(&series, &VariableSelection::All, config.omit_quality_flag)?;
        for (variable, table) in tidy {
            accumulated.entry(variable).or_default().push(table);
        }
    }

    for (variable, tables) in accumulated {
        let mut stacked = concat_df_diagonal(&tables)?;
        if stacked.height() == 0 {
            continue;
        }
        stacked = stacked.sort(["date"], SortMultipleOptions::default())?;
        write_csv(&mut stacked, &target.join(format!("{variable}.csv")))?;
    }
    Ok(())
}

/// Query stations inside the catchment first, then within the configured
/// radius of the centroid, then the closest-n fallback.
fn query_with_fallback<S: StationProvider>(
    config: &BuildConfig,
    ezg: &Catchment,
    stations: &S,
    request: &ObservationRequest,
) -> Result<Vec<StationSeries>> {
    let empty = |series: &[StationSeries]| series.iter().all(|s| s.records.is_empty());

    let inside = stations
        .query(&ezg.bbox_query()?, request)
        .context("bbox station query failed")?;
    if !empty(&inside) {
        return Ok(inside);
    }

    debug!("no stations inside the catchment, widening to centroid radius");
    let around = stations
        .query(&ezg.distance_query(config.station_distance_km)?, request)
        .context("distance station query failed")?;
    if !empty(&around) {
        return Ok(around);
    }

    debug!("no stations within radius, falling back to closest-n");
    stations
        .query(&ezg.rank_query(config.station_closest_n)?, request)
        .context("rank station query failed")
}

fn write_radar_table(
    config: &BuildConfig,
    ezg: &Catchment,
    target: &Path,
    caches: &[RadarCache],
) -> Result<()> {
    let mut tables = Vec::new();
    for cache in caches {
        let mut chunks = Vec::with_capacity(cache.rasters().len());
        for raster in cache.rasters() {
            chunks.push(clip_to_catchment(ezg, raster)?);
        }
        tables.push(spatial_reduce(&chunks, cache.timestamps(), &config.statistics)?);
    }
    if tables.is_empty() {
        return Ok(());
    }

    let mut stacked = concat_df_diagonal(&tables)?;
    if stacked.height() == 0 {
        return Ok(());
    }
    write_csv(&mut stacked, &target.join("radolan.csv"))?;
    Ok(())
}
