//! Transpose long-format station records into wide per-variable tables.

use std::collections::BTreeMap;

use log::debug;
use polars::prelude::*;

use crate::error::Result;
use crate::provider::{StationRecord, StationSeries};

/// Short aliases for the provider's canonical variable identifiers.
const VARIABLE_ALIASES: [(&str, &str); 3] = [
    ("humidity", "humidity"),
    ("temperature", "temperature_air_mean_200"),
    ("temp", "temperature_air_mean_200"),
];

/// Which physical variables to keep when transposing.
#[derive(Debug, Clone, Default)]
pub enum VariableSelection {
    /// Keep every variable present in the records.
    #[default]
    All,
    /// Keep the named variables, given as short aliases or canonical
    /// identifiers. Unrecognized names are dropped, not errors.
    Named(Vec<String>),
}

impl VariableSelection {
    pub fn named<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        VariableSelection::Named(names.into_iter().map(Into::into).collect())
    }

    /// Resolve to canonical identifiers; `None` means no filtering.
    fn resolve(&self) -> Option<Vec<String>> {
        match self {
            VariableSelection::All => None,
            VariableSelection::Named(names) => {
                let mut canonical = Vec::new();
                for name in names {
                    let resolved = VARIABLE_ALIASES
                        .iter()
                        .find(|(alias, target)| alias == name || target == name)
                        .map(|(_, target)| target.to_string());
                    match resolved {
                        Some(target) => {
                            if !canonical.contains(&target) {
                                canonical.push(target);
                            }
                        }
                        None => debug!("dropping unknown variable '{name}'"),
                    }
                }
                Some(canonical)
            }
        }
    }
}

/// Reshape per-station observation frames into one wide table per variable.
///
/// Each station contributes a `{station_id}` value column (and, unless
/// `omit_quality_flag` is set, a `quality_{station_id}` column) to the table
/// of every variable it reports. Stations are merged by outer join on date,
/// so dates covered by only some stations survive with nulls for the rest.
/// Empty per-station subsets are skipped.
pub fn transpose_station_data(
    series: &[StationSeries],
    variables: &VariableSelection,
    omit_quality_flag: bool,
) -> Result<BTreeMap<String, DataFrame>> {
    let requested = variables.resolve();
    let mut tidy: BTreeMap<String, DataFrame> = BTreeMap::new();

    for station in series {
        let mut by_parameter: BTreeMap<&str, Vec<&StationRecord>> = BTreeMap::new();
        for record in &station.records {
            by_parameter
                .entry(record.parameter.as_str())
                .or_default()
                .push(record);
        }

        for (parameter, records) in by_parameter {
            if records.is_empty() {
                continue;
            }
            if let Some(requested) = &requested {
                if !requested.iter().any(|name| name == parameter) {
                    continue;
                }
            }

            let frame = station_frame(&station.station_id, &records, omit_quality_flag)?;
            let merged = match tidy.remove(parameter) {
                None => frame,
                Some(existing) => existing
                    .lazy()
                    .join(
                        frame.lazy(),
                        [col("date")],
                        [col("date")],
                        JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
                    )
                    .collect()?,
            };
            tidy.insert(parameter.to_string(), merged);
        }
    }

    for table in tidy.values_mut() {
        *table = table.sort(["date"], SortMultipleOptions::default())?;
    }
    Ok(tidy)
}

/// One station's date-indexed frame for a single variable.
fn station_frame(
    station_id: &str,
    records: &[&StationRecord],
    omit_quality_flag: bool,
) -> Result<DataFrame> {
    let dates: Vec<_> = records.iter().map(|r| r.date).collect();
    let values: Vec<f64> = records.iter().map(|r| r.value).collect();

    let mut columns = vec![
        Column::new("date".into(), dates),
        Column::new(station_id.into(), values),
    ];
    if !omit_quality_flag {
        let quality: Vec<Option<f64>> = records.iter().map(|r| r.quality).collect();
        columns.push(Column::new(format!("quality_{station_id}").into(), quality));
    }
    Ok(DataFrame::new(columns)?)
}
