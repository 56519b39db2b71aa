//! Request resolution and response reconciliation.
//!
//! The resolver reads parameters out of the Fit State by name; the reconciler
//! writes response outputs back under a per-function rule table.

pub mod engine;
pub mod resolver;
pub mod rules;
pub mod types;

pub use engine::Reconciler;
pub use resolver::{preview_request, resolve, resolve_with, source_field};
pub use rules::{default_rules, load_rules};
pub use types::{FieldRule, FunctionRule, ReconcileOutcome, ReconcilePlan, RulesConfig};
