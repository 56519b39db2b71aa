//! Multi-call workflows built on the curve engine.

pub mod corrections;
pub mod manual;
pub mod steps;

pub use corrections::{fetch_corrections, push_corrections, CorrectionSet, CorrectionsResult};
pub use manual::{parse_request, send_raw, ManualRequest};
pub use steps::{apply_steps, STEP_FUNCTIONS};
