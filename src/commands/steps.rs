//! The eight-call initialisation sequence run before fetching any gains.

use tracing::{info, warn};

use crate::curves::CurveEngine;
use crate::error::Result;
use crate::events::{emit, LogEntry, UiEvent};

pub const STEP_FUNCTIONS: [&str; 8] = [
    "SetAdultChild",
    "SetExperience",
    "SetCompSpeed",
    "SetTonalLanguage",
    "SetGender",
    "CrossOverFrequencies_NL2",
    "setBWC",
    "CompressionThreshold_NL2",
];

/// Send steps 1 to 8 in order, reconciling each.
///
/// Stops at the first failure. A sequence update and an outputs-changed
/// notification are sent at the end either way. `setBWC` reads `crossOver`
/// from the band edges the previous step just stored.
pub async fn apply_steps(engine: &CurveEngine) -> Result<usize> {
    if let Err(e) = engine.store().save() {
        warn!("Saving before steps failed: {}", e);
    }
    let events = engine.store().events();

    let mut done = 0;
    let mut outcome = Ok(());
    for (n, function) in STEP_FUNCTIONS.iter().enumerate() {
        if let Err(e) = engine.invoke(function).await {
            emit(events, UiEvent::Log(LogEntry::now(format!("Step {} ({}) failed: {}", n + 1, function, e))));
            outcome = Err(e);
            break;
        }
        done += 1;
    }
    if outcome.is_ok() {
        emit(events, UiEvent::Log(LogEntry::now("Steps 1-8 complete")));
        info!("Steps 1-8 complete");
    }

    emit(events, UiEvent::SequenceUpdated(engine.client().sequence()));
    emit(events, UiEvent::OutputsChanged);
    outcome.map(|_| done)
}
