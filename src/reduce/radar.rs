//! Spatial reduction of a clipped raster stack into a tidy table.

use std::str::FromStr;

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::raster::MaskedGrid;

/// A per-grid summary statistic computed over the valid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Mean,
    Mode,
    Min,
    Max,
    Sum,
}

impl Statistic {
    pub const ALL: [Statistic; 5] = [
        Statistic::Mean,
        Statistic::Mode,
        Statistic::Min,
        Statistic::Max,
        Statistic::Sum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Mode => "mode",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Sum => "sum",
        }
    }

    fn apply(&self, grid: &MaskedGrid) -> Option<f64> {
        match self {
            Statistic::Mean => grid.mean(),
            Statistic::Mode => grid.mode(),
            Statistic::Min => grid.min(),
            Statistic::Max => grid.max(),
            Statistic::Sum => grid.sum(),
        }
    }
}

impl FromStr for Statistic {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Statistic::Mean),
            "mode" => Ok(Statistic::Mode),
            "min" => Ok(Statistic::Min),
            "max" => Ok(Statistic::Max),
            "sum" => Ok(Statistic::Sum),
            other => Err(format!("unknown statistic '{other}'")),
        }
    }
}

/// Reduce each clipped grid to the requested statistics.
///
/// Row `i` of the result belongs to `timestamps[i]`; the `timestamp` column
/// comes first, followed by one column per statistic in the order given
/// (duplicates collapse to the first occurrence). A grid with zero valid
/// cells yields a null in every statistic column of its row.
pub fn spatial_reduce(
    chunks: &[MaskedGrid],
    timestamps: &[NaiveDateTime],
    statistics: &[Statistic],
) -> Result<DataFrame> {
    if chunks.len() != timestamps.len() {
        return Err(Error::AlignmentMismatch {
            left: chunks.len(),
            right: timestamps.len(),
        });
    }

    let mut selected: Vec<Statistic> = Vec::new();
    for stat in statistics {
        if !selected.contains(stat) {
            selected.push(*stat);
        }
    }

    let mut columns = vec![Column::new("timestamp".into(), timestamps.to_vec())];
    for stat in selected {
        let values: Vec<Option<f64>> = chunks.iter().map(|chunk| stat.apply(chunk)).collect();
        columns.push(Column::new(stat.as_str().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 7, 14)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn chunk(values: ndarray::Array2<f64>) -> MaskedGrid {
        let valid = values.mapv(|_| true);
        MaskedGrid::new(values, valid).unwrap()
    }

    #[test]
    fn one_row_per_grid_one_column_per_statistic() {
        let chunks = vec![chunk(array![[1.0, 2.0], [3.0, 4.0]]), chunk(array![[10.0]])];
        let df = spatial_reduce(&chunks, &[hour(0), hour(1)], &Statistic::ALL).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(
            df.get_column_names_str(),
            ["timestamp", "mean", "mode", "min", "max", "sum"]
        );
        let sums = df.column("sum").unwrap().f64().unwrap();
        assert_eq!(sums.get(0), Some(10.0));
        assert_eq!(sums.get(1), Some(10.0));
        let means = df.column("mean").unwrap().f64().unwrap();
        assert_eq!(means.get(0), Some(2.5));
    }

    #[test]
    fn subset_selects_and_orders_columns() {
        let chunks = vec![chunk(array![[2.0, 4.0]])];
        let df =
            spatial_reduce(&chunks, &[hour(0)], &[Statistic::Sum, Statistic::Mean]).unwrap();
        assert_eq!(df.get_column_names_str(), ["timestamp", "sum", "mean"]);
    }

    #[test]
    fn empty_mask_produces_null_row() {
        let chunks = vec![MaskedGrid::all_invalid(3, 3)];
        let df = spatial_reduce(&chunks, &[hour(0)], &[Statistic::Mean, Statistic::Max]).unwrap();
        assert_eq!(df.column("mean").unwrap().f64().unwrap().get(0), None);
        assert_eq!(df.column("max").unwrap().f64().unwrap().get(0), None);
    }

    #[test]
    fn length_mismatch_is_fatal() {
        let chunks = vec![chunk(array![[1.0]])];
        let result = spatial_reduce(&chunks, &[hour(0), hour(1)], &[Statistic::Mean]);
        assert!(matches!(
            result,
            Err(Error::AlignmentMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn empty_stack_yields_empty_table() {
        let df = spatial_reduce(&[], &[], &[Statistic::Sum]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.get_column_names_str(), ["timestamp", "sum"]);
    }
}
