use anyhow::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use super::types::FitState;

/// Write the state document to disk atomically.
///
/// The compacted JSON goes to a temp file beside `target_path`, which is then
/// renamed over the target, so an interrupted write never leaves a partial file.
pub fn write_state_atomic(state: &FitState, target_path: &Path) -> Result<()> {
    let json = state.to_json()?;

    let parent = match target_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => anyhow::bail!("Target path has no parent directory: {:?}", target_path),
    };

    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(json.as_bytes())?;
    temp.flush()?;
    temp.persist(target_path)?;

    info!("Wrote state ({} fields) to {:?}", state.field_count(), target_path);
    Ok(())
}
