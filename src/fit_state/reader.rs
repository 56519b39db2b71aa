use anyhow::Result;
use std::path::Path;
use tracing::{debug, info, warn};

use super::types::FitState;
use super::writer::write_state_atomic;

/// Read a state document from disk.
pub fn read_state(path: &Path) -> Result<FitState> {
    let content = std::fs::read_to_string(path)?;
    let state = FitState::from_json(&content)?;
    debug!("Read state with {} fields from {:?}", state.field_count(), path);
    Ok(state)
}

/// Load the state at `path`, never failing.
///
/// A missing file is created with defaults. A file that cannot be read or
/// parsed yields defaults and is left alone on disk.
pub fn load_or_default(path: &Path) -> FitState {
    if !path.exists() {
        let state = FitState::default();
        match write_state_atomic(&state, path) {
            Ok(()) => info!("Created default state at {:?}", path),
            Err(e) => warn!("Failed to write default state to {:?}: {}", path, e),
        }
        return state;
    }

    match read_state(path) {
        Ok(state) => state,
        Err(e) => {
            warn!("Failed to load state from {:?}, using defaults: {}", path, e);
            FitState::default()
        }
    }
}
