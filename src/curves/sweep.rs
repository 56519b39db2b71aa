//! The two sequencing strategies for multi-call curve builds.
//!
//! [`AtomicSweep`] yields all of its results or none. [`PartialCommitSweep`]
//! keeps every step that succeeded and reports the rest. Both run their steps
//! strictly one after another.

use std::future::Future;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;

/// Input levels of the standard three-level sweep, in dB.
pub const STANDARD_LEVELS: [i64; 3] = [50, 65, 80];

pub struct AtomicSweep {
    levels: Vec<i64>,
}

impl Default for AtomicSweep {
    fn default() -> Self {
        Self::new(STANDARD_LEVELS.to_vec())
    }
}

impl AtomicSweep {
    pub fn new(levels: Vec<i64>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[i64] {
        &self.levels
    }

    /// Run `step` per level. The first failure discards everything collected.
    pub async fn run<T, F, Fut>(&self, mut step: F) -> Result<Vec<(i64, T)>>
    where
        F: FnMut(i64) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut collected = Vec::with_capacity(self.levels.len());
        for &level in &self.levels {
            match step(level).await {
                Ok(value) => collected.push((level, value)),
                Err(e) => {
                    warn!("Sweep aborted at {} dB, discarding {} result(s): {}", level, collected.len(), e);
                    return Err(e);
                }
            }
        }
        info!("Sweep complete over {:?} dB", self.levels);
        Ok(collected)
    }
}

/// Which indices a best-effort sweep filled and which it skipped (with why).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub filled: Vec<usize>,
    pub skipped: Vec<(usize, String)>,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct PartialCommitSweep {
    indices: Vec<usize>,
}

impl PartialCommitSweep {
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Run `step` per index; a failure skips that index and the sweep goes on.
    pub async fn run<T, F, Fut>(&self, mut step: F) -> (Vec<(usize, T)>, SweepReport)
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut results = Vec::new();
        let mut report = SweepReport::default();
        for &index in &self.indices {
            match step(index).await {
                Ok(value) => {
                    results.push((index, value));
                    report.filled.push(index);
                }
                Err(e) => {
                    warn!("Skipping index {}: {}", index, e);
                    report.skipped.push((index, e.to_string()));
                }
            }
        }
        info!(
            "Sweep filled {} of {} indices",
            report.filled.len(),
            self.indices.len()
        );
        (results, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallerError;

    #[tokio::test]
    async fn test_atomic_sweep_all_or_nothing() {
        let sweep = AtomicSweep::default();
        let ok = sweep.run(|level| async move { Ok(level * 2) }).await.unwrap();
        assert_eq!(ok, vec![(50, 100), (65, 130), (80, 160)]);

        let mut calls = Vec::new();
        let err = sweep
            .run(|level| {
                calls.push(level);
                async move {
                    if level == 65 {
                        Err(CallerError::Transport("refused".into()))
                    } else {
                        Ok(level)
                    }
                }
            })
            .await
            .unwrap_err();
        assert!(err.is_transport());
        // aborted: 80 dB is never requested
        assert_eq!(calls, vec![50, 65]);
    }

    #[tokio::test]
    async fn test_partial_sweep_skips_and_continues() {
        let sweep = PartialCommitSweep::new(0..=4);
        let (results, report) = sweep
            .run(|i| async move {
                if i % 2 == 1 {
                    Err(CallerError::Protocol(format!("bad {}", i)))
                } else {
                    Ok(i as f64)
                }
            })
            .await;
        assert_eq!(results, vec![(0, 0.0), (2, 2.0), (4, 4.0)]);
        assert_eq!(report.filled, vec![0, 2, 4]);
        assert_eq!(report.skipped.len(), 2);
        assert!(!report.is_complete());
    }
}
