use serde::Serialize;

use crate::bands::{BandGrid, NOT_MEASURED};
use crate::error::{CallerError, Result};
use crate::fit_state::FitState;

/// A named per-band series where `None` means "no data point".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveSeries {
    pub name: String,
    pub grid: BandGrid,
    pub points: Vec<Option<f64>>,
}

impl CurveSeries {
    pub fn new(name: impl Into<String>, grid: BandGrid, points: Vec<Option<f64>>) -> Result<Self> {
        let name = name.into();
        if points.len() != grid.len() {
            return Err(CallerError::Validation(format!(
                "Series '{}' has {} points, grid needs {}",
                name,
                points.len(),
                grid.len()
            )));
        }
        Ok(Self { name, grid, points })
    }

    /// Build from a committed array.
    ///
    /// An all-zero array is entirely absent (it cannot be told apart from one
    /// never fetched). Non-finite values and, on the audiometric grid, the
    /// not-measured sentinel are absent too.
    pub fn from_values(name: impl Into<String>, values: &[f64]) -> Result<Self> {
        let name = name.into();
        let grid = BandGrid::for_len(values.len()).ok_or_else(|| {
            CallerError::Validation(format!("Series '{}' has no band grid of length {}", name, values.len()))
        })?;
        let all_zero = values.iter().all(|&v| v == 0.0);
        let points = values
            .iter()
            .map(|&v| {
                let sentinel = grid == BandGrid::Audiometric && v == NOT_MEASURED;
                if all_zero || sentinel || !v.is_finite() {
                    None
                } else {
                    Some(v)
                }
            })
            .collect();
        Self::new(name, grid, points)
    }

    pub fn from_state(state: &FitState, field: &str, name: impl Into<String>) -> Result<Self> {
        let values = state
            .array(field)
            .ok_or_else(|| CallerError::Validation(format!("'{}' is not a numeric array", field)))?;
        Self::from_values(name, &values)
    }

    pub fn present_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }

    /// Maximal runs of consecutive present points as `(band index, value)`.
    pub fn runs(&self) -> Vec<Vec<(f64, f64)>> {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for (i, p) in self.points.iter().enumerate() {
            match p {
                Some(y) => current.push((i as f64, *y)),
                None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }
}
