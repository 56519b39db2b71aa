//! Bulk fetch and push of the RECDh/RECDt/REDD/REUR correction sets.

use serde::Serialize;
use tracing::{info, warn};

use crate::bands::BandGrid;
use crate::curves::CurveEngine;
use crate::error::{CallerError, Result};

/// The four correction arrays of one grid and the functions that move them.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionSet {
    pub grid: BandGrid,
    pub fields: [&'static str; 4],
    pub getters: [&'static str; 4],
    pub setters: [&'static str; 4],
}

impl CorrectionSet {
    pub fn for_grid(grid: BandGrid) -> Self {
        match grid {
            BandGrid::ThirdOctave => Self {
                grid,
                fields: ["RECDh", "RECDt", "REDD", "REUR"],
                getters: ["GetRECDh_indiv_NL2", "GetRECDt_indiv_NL2", "GetREDDindiv", "GetREURindiv"],
                setters: ["SetRECDh_indiv_NL2", "SetRECDt_indiv_NL2", "SetREDDindiv", "SetREURindiv"],
            },
            BandGrid::Audiometric => Self {
                grid,
                fields: ["RECDh9", "RECDt9", "REDD9", "REUR9"],
                getters: ["GetRECDh_indiv9_NL2", "GetRECDt_indiv9_NL2", "GetREDDindiv9", "GetREURindiv9"],
                setters: ["SetRECDh_indiv9_NL2", "SetRECDt_indiv9_NL2", "SetREDDindiv9", "SetREURindiv9"],
            },
        }
    }
}

/// Tally of a four-call correction workflow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorrectionsResult {
    pub completed: Vec<String>,
    pub updated: Vec<String>,
}

/// Get all four sets in order, reconciling each response as it arrives.
///
/// The first failure stops the sequence; responses already reconciled stay.
pub async fn fetch_corrections(engine: &CurveEngine, grid: BandGrid) -> Result<CorrectionsResult> {
    let set = CorrectionSet::for_grid(grid);
    let mut result = CorrectionsResult::default();
    for function in set.getters {
        match engine.invoke(function).await {
            Ok(outcome) => {
                result.completed.push(function.to_string());
                result.updated.extend(outcome.updated);
            }
            Err(e) => {
                warn!("Fetching corrections stopped at {}: {}", function, e);
                return Err(e);
            }
        }
    }
    info!("Fetched {:?} corrections: {:?}", grid, result.updated);
    Ok(result)
}

/// Check every array has the grid's length before anything is sent.
pub fn check_lengths(engine: &CurveEngine, set: &CorrectionSet) -> Result<()> {
    let expected = set.grid.len();
    engine.store().read(|state| {
        let bad: Vec<String> = set
            .fields
            .iter()
            .filter_map(|&field| {
                let len = state.get(field).and_then(|v| v.as_array()).map(|a| a.len());
                (len != Some(expected)).then(|| format!("{} ({})", field, len.map_or("missing".to_string(), |n| n.to_string())))
            })
            .collect();
        if bad.is_empty() {
            Ok(())
        } else {
            Err(CallerError::Validation(format!(
                "Cannot push corrections, expected {} values in: {}",
                expected,
                bad.join(", ")
            )))
        }
    })
}

/// Push all four sets. Lengths are checked for all of them up front, so a bad
/// array means no call at all.
pub async fn push_corrections(engine: &CurveEngine, grid: BandGrid) -> Result<CorrectionsResult> {
    let set = CorrectionSet::for_grid(grid);
    check_lengths(engine, &set)?;

    let mut result = CorrectionsResult::default();
    for function in set.setters {
        let outcome = engine.invoke(function).await?;
        result.completed.push(function.to_string());
        result.updated.extend(outcome.updated);
    }
    info!("Pushed {:?} corrections", grid);
    Ok(result)
}
