use ndarray::Array2;

use crate::error::{Error, Result};

/// A grid with a validity mask. Invalid cells (outside the clip polygon or
/// equal to the no-data sentinel) are excluded from every reduction.
#[derive(Debug, Clone)]
pub struct MaskedGrid {
    data: Array2<f64>,
    valid: Array2<bool>,
}

impl MaskedGrid {
    pub fn new(data: Array2<f64>, valid: Array2<bool>) -> Result<Self> {
        if data.dim() != valid.dim() {
            return Err(Error::MaskShape {
                data: data.dim(),
                mask: valid.dim(),
            });
        }
        Ok(Self { data, valid })
    }

    /// A grid with zero valid cells.
    pub fn all_invalid(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
            valid: Array2::from_elem((rows, cols), false),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.valid
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// Iterate over the valid cell values.
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .zip(self.valid.iter())
            .filter_map(|(value, valid)| valid.then_some(*value))
    }

    pub fn sum(&self) -> Option<f64> {
        let mut any = false;
        let mut acc = 0.0;
        for v in self.valid_values() {
            any = true;
            acc += v;
        }
        any.then_some(acc)
    }

    pub fn mean(&self) -> Option<f64> {
        let count = self.valid_count();
        (count > 0).then(|| self.sum().unwrap_or(0.0) / count as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.valid_values().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.valid_values().reduce(f64::max)
    }

    /// Most frequent valid value; ties resolve to the smallest value.
    pub fn mode(&self) -> Option<f64> {
        let mut values: Vec<f64> = self.valid_values().collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let mut best = values[0];
        let mut best_count = 0usize;
        let mut run = values[0];
        let mut run_count = 0usize;
        for v in values {
            if v == run {
                run_count += 1;
            } else {
                run = v;
                run_count = 1;
            }
            // strict: among equal counts the first (smallest) run wins
            if run_count > best_count {
                best = run;
                best_count = run_count;
            }
        }
        Some(best)
    }
}
