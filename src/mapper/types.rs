//! Types for the request resolver and the response reconciler.
//!
//! Rule types deserialize from `reconcile_rules.toml`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of the reconcile rule document.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    pub functions: Vec<FunctionRule>,
}

/// Which state fields one remote function's response fills.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionRule {
    pub function: String,
    pub fields: Vec<FieldRule>,
}

/// Destination field and the accepted response keys, in priority order.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    pub field: String,
    pub keys: Vec<String>,
}

/// Updates extracted from one response, not yet committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub updates: Vec<(String, Value)>,
    /// Fields whose keys were all absent, null or invalid.
    pub skipped: Vec<String>,
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    pub function: String,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        !self.updated.is_empty()
    }
}
