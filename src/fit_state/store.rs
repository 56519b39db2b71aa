use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::reader::{load_or_default, read_state};
use super::types::FitState;
use super::writer::write_state_atomic;
use crate::error::{CallerError, Result};
use crate::events::{emit, EventSender, UiEvent};

/// The single shared Fit State, handed to every component as `Arc<FitStore>`.
///
/// Every mutation funnels through [`FitStore::commit`] or [`FitStore::edit`],
/// which persist once and then notify `ConfigSaved`, `OutputsChanged` and
/// `BandViewsChanged` in that order. The state lock is only held for the
/// in-memory update; concurrent actions race with last-write-wins. Autosaves
/// are serialized and each writes the state as of its own write, so the file
/// never ends up older than memory.
pub struct FitStore {
    state: Mutex<FitState>,
    path: Mutex<PathBuf>,
    persist: Mutex<()>,
    events: EventSender,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FitStore {
    pub fn new(state: FitState, path: PathBuf, events: EventSender) -> Self {
        Self {
            state: Mutex::new(state),
            path: Mutex::new(path),
            persist: Mutex::new(()),
            events,
        }
    }

    /// Load (or create) the document at `path`.
    pub fn open(path: PathBuf, events: EventSender) -> Self {
        let state = load_or_default(&path);
        Self::new(state, path, events)
    }

    pub fn path(&self) -> PathBuf {
        lock(&self.path).clone()
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    pub fn snapshot(&self) -> FitState {
        lock(&self.state).clone()
    }

    /// Run `f` against the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&FitState) -> R) -> R {
        f(&lock(&self.state))
    }

    /// Apply a batch of field updates as one mutation.
    ///
    /// Every update is validated first; if any fails nothing is written. An
    /// empty batch is a no-op with no persist and no notifications.
    pub fn commit(&self, updates: Vec<(String, Value)>) -> Result<usize> {
        if updates.is_empty() {
            return Ok(0);
        }
        let count = updates.len();
        self.edit(move |state| {
            for (name, value) in updates {
                state.set(&name, value)?;
            }
            Ok(count)
        })
    }

    /// Mutate the state through `f`. On error the state is left exactly as it was.
    pub fn edit<R>(&self, f: impl FnOnce(&mut FitState) -> Result<R>) -> Result<R> {
        let out = {
            let mut guard = lock(&self.state);
            let mut draft = guard.clone();
            let out = f(&mut draft)?;
            *guard = draft;
            out
        };
        self.after_mutation();
        Ok(out)
    }

    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        self.commit(vec![(name.to_string(), value)]).map(|_| ())
    }

    pub fn set_array(&self, name: &str, values: &[f64]) -> Result<()> {
        self.set(name, Value::from(values.to_vec()))
    }

    pub fn set_band(&self, name: &str, index: usize, value: f64) -> Result<()> {
        self.edit(|state| state.set_band(name, index, value))
    }

    pub fn clear(&self, name: &str) -> Result<()> {
        self.edit(|state| state.clear(name))
    }

    /// Write the current state to the current path.
    pub fn save(&self) -> Result<PathBuf> {
        let path = {
            let _persist = lock(&self.persist);
            let path = self.path();
            let state = self.snapshot();
            write_state_atomic(&state, &path).map_err(|e| CallerError::Storage(format!("{:#}", e)))?;
            path
        };
        emit(&self.events, UiEvent::ConfigSaved(path.clone()));
        Ok(path)
    }

    /// Write to `path` and make it the current document.
    pub fn save_as(&self, path: &Path) -> Result<()> {
        {
            let _persist = lock(&self.persist);
            let state = self.snapshot();
            write_state_atomic(&state, path).map_err(|e| CallerError::Storage(format!("{:#}", e)))?;
            *lock(&self.path) = path.to_path_buf();
        }
        info!("State path is now {:?}", path);
        emit(&self.events, UiEvent::ConfigSaved(path.to_path_buf()));
        Ok(())
    }

    /// Replace the record with the document at `path` and make it current.
    pub fn load_from(&self, path: &Path) -> Result<()> {
        let loaded = read_state(path)
            .map_err(|e| CallerError::Storage(format!("Failed to load {:?}: {:#}", path, e)))?;
        *lock(&self.path) = path.to_path_buf();
        *lock(&self.state) = loaded;
        info!("Loaded state from {:?}", path);
        self.after_mutation();
        Ok(())
    }

    /// Raw access that bypasses the schema. No persist, no notify, and the
    /// fixed-length invariant is not checked; consumers must not index blindly.
    #[doc(hidden)]
    pub fn with_raw<R>(&self, f: impl FnOnce(&mut serde_json::Map<String, Value>) -> R) -> R {
        f(lock(&self.state).raw_mut())
    }

    /// Persist and notify. The snapshot is taken under the persist lock, so the
    /// last autosave to run writes the newest state.
    fn after_mutation(&self) {
        let (path, written) = {
            let _persist = lock(&self.persist);
            let path = self.path();
            let state = self.snapshot();
            let written = write_state_atomic(&state, &path);
            (path, written)
        };
        match written {
            Ok(()) => emit(&self.events, UiEvent::ConfigSaved(path)),
            Err(e) => {
                warn!("Autosave to {:?} failed: {:#}", path, e);
                emit(&self.events, UiEvent::Error(format!("Autosave failed: {:#}", e)));
            }
        }
        emit(&self.events, UiEvent::OutputsChanged);
        emit(&self.events, UiEvent::BandViewsChanged);
        debug!("State mutation committed");
    }
}
