//! Derived curves: per-level gain/response pairs and the per-band GainAt sweep.

pub mod engine;
pub mod math;
pub mod sweep;

pub use engine::{CurveEngine, GainFunction, LevelCurve, LevelSlot};
pub use math::{mpo_ceiling, response_curve};
pub use sweep::{AtomicSweep, PartialCommitSweep, SweepReport, STANDARD_LEVELS};
