//! Applies a response to the Fit State through the data-driven rule table.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::types::{FieldRule, ReconcileOutcome, ReconcilePlan, RulesConfig};
use crate::error::Result;
use crate::fit_state::{schema, FitStore};
use crate::session::ResponseEnvelope;

pub struct Reconciler {
    rules: HashMap<String, Vec<FieldRule>>,
}

impl Reconciler {
    pub fn new(config: RulesConfig) -> Self {
        let rules = config
            .functions
            .into_iter()
            .map(|f| (f.function, f.fields))
            .collect();
        Self { rules }
    }

    pub fn knows(&self, function: &str) -> bool {
        self.rules.contains_key(function)
    }

    pub fn candidate_keys(&self, function: &str, field: &str) -> Option<&[String]> {
        self.rules
            .get(function)?
            .iter()
            .find(|r| r.field == field)
            .map(|r| r.keys.as_slice())
    }

    /// First accepted key that is present, non-null and valid for `field`,
    /// already coerced to the stored representation.
    pub fn extract(&self, function: &str, field: &str, response: &ResponseEnvelope) -> Option<Value> {
        let keys = self.candidate_keys(function, field)?;
        first_valid(field, keys, response)
    }

    /// Compute the updates a response implies without touching any state.
    pub fn plan(&self, function: &str, response: &ResponseEnvelope) -> ReconcilePlan {
        let mut plan = ReconcilePlan::default();
        let Some(fields) = self.rules.get(function) else {
            debug!("No reconcile rules for {}", function);
            return plan;
        };
        for rule in fields {
            match first_valid(&rule.field, &rule.keys, response) {
                Some(value) => plan.updates.push((rule.field.clone(), value)),
                None => plan.skipped.push(rule.field.clone()),
            }
        }
        plan
    }

    /// Write the response into the store as a single commit.
    ///
    /// The function identity is the one the service echoed, else `sent_function`.
    pub fn apply(&self, store: &FitStore, sent_function: &str, response: &ResponseEnvelope) -> Result<ReconcileOutcome> {
        let function = response.function_or(sent_function).to_string();
        let plan = self.plan(&function, response);
        let updated: Vec<String> = plan.updates.iter().map(|(f, _)| f.clone()).collect();

        store.commit(plan.updates)?;
        if !updated.is_empty() {
            info!("Reconciled {}: updated {:?}", function, updated);
        }
        Ok(ReconcileOutcome {
            function,
            updated,
            skipped: plan.skipped,
        })
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(super::rules::default_rules())
    }
}

fn first_valid(field: &str, keys: &[String], response: &ResponseEnvelope) -> Option<Value> {
    let spec = schema::lookup(field)?;
    for key in keys {
        let Some(raw) = response.output(key) else {
            continue;
        };
        match spec.coerce(raw) {
            Ok(v) => return Some(v),
            Err(e) => warn!("Ignoring '{}' for {}: {}", key, field, e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{channel, EventReceiver, UiEvent};
    use crate::fit_state::FitState;
    use serde_json::json;

    fn response(v: Value) -> ResponseEnvelope {
        serde_json::from_value(v).unwrap()
    }

    fn store() -> (tempfile::TempDir, FitStore, EventReceiver) {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = channel();
        let store = FitStore::new(FitState::default(), dir.path().join("s.json"), tx);
        (dir, store, rx)
    }

    fn count(rx: &mut EventReceiver) -> (usize, usize, usize) {
        let (mut saved, mut outputs, mut bands) = (0, 0, 0);
        while let Ok(ev) = rx.try_recv() {
            match ev {
                UiEvent::ConfigSaved(_) => saved += 1,
                UiEvent::OutputsChanged => outputs += 1,
                UiEvent::BandViewsChanged => bands += 1,
                _ => {}
            }
        }
        (saved, outputs, bands)
    }

    #[test]
    fn test_first_present_key_wins() {
        let r = Reconciler::default();
        let resp = response(json!({"output_parameters": {"gain": vec![2.0; 19], "REAG19": vec![3.0; 19]}}));
        let plan = r.plan("RealEarAidedGain_NL2", &resp);
        assert_eq!(plan.updates, vec![("REAG".to_string(), json!(vec![2.0; 19]))]);

        let resp = response(json!({"output_parameters": {"REAG": null, "REAG19": vec![3.0; 19]}}));
        let plan = r.plan("RealEarAidedGain_NL2", &resp);
        assert_eq!(plan.updates[0].1, json!(vec![3.0; 19]));
    }

    #[test]
    fn test_nine_band_key_goes_to_nine_band_field() {
        let (_dir, store, _rx) = store();
        let r = Reconciler::default();
        let resp = response(json!({"function": "GetREURindiv9", "output_parameters": {"REUR": vec![1.0; 9]}}));
        let out = r.apply(&store, "GetREURindiv9", &resp).unwrap();
        assert_eq!(out.updated, vec!["REUR9"]);
        store.read(|s| {
            assert_eq!(s.array("REUR9").unwrap(), vec![1.0; 9]);
            assert!(s.is_all_zero("REUR"));
        });
    }

    #[test]
    fn test_multi_field_notifies_once() {
        let (_dir, store, mut rx) = store();
        let r = Reconciler::default();
        let resp = response(json!({
            "function": "ReturnValues_NL2",
            "output_parameters": {"MAF": vec![1.0; 19], "BWC": vec![2.0; 19], "ESCD": vec![3.0; 19]}
        }));
        let out = r.apply(&store, "ReturnValues_NL2", &resp).unwrap();
        assert_eq!(out.updated.len(), 3);
        assert_eq!(count(&mut rx), (1, 1, 1));
    }

    #[test]
    fn test_unknown_function_and_empty_response_are_noops() {
        let (_dir, store, mut rx) = store();
        let r = Reconciler::default();
        let out = r
            .apply(&store, "SetGender", &response(json!({"output_parameters": {"success": true}})))
            .unwrap();
        assert!(!out.changed());
        let out = r
            .apply(&store, "getMPO_NL2", &response(json!({"output_parameters": null})))
            .unwrap();
        assert_eq!(out.skipped, vec!["MPO"]);
        assert_eq!(count(&mut rx), (0, 0, 0));
    }

    #[test]
    fn test_wrong_length_is_skipped() {
        let (_dir, store, _rx) = store();
        let r = Reconciler::default();
        let resp = response(json!({"function": "CompressionThreshold_NL2", "output_parameters": {"CT": vec![1.0; 18]}}));
        let out = r.apply(&store, "CompressionThreshold_NL2", &resp).unwrap();
        assert!(!out.changed());
        assert!(store.read(|s| s.is_all_zero("CT")));
    }

    #[test]
    fn test_echoed_function_takes_precedence() {
        let (_dir, store, _rx) = store();
        let r = Reconciler::default();
        let resp = response(json!({"function": "GetMLE", "output_parameters": {"MLE": vec![4.0; 19]}}));
        let out = r.apply(&store, "something_else", &resp).unwrap();
        assert_eq!(out.function, "GetMLE");
        assert_eq!(store.read(|s| s.array("MLE")).unwrap(), vec![4.0; 19]);
    }

    #[test]
    fn test_service_output_names() {
        let r = Reconciler::default();
        let resp = response(json!({"output_parameters": {"TccGain": vec![5.0; 19], "lineType": vec![1; 19]}}));
        let plan = r.plan("TccCouplerGain_NL2", &resp);
        assert_eq!(plan.updates[0].0, "TccCG");
        assert_eq!(plan.updates[1], ("lineType19".to_string(), json!(vec![1; 19])));

        let resp = response(json!({"output_parameters": {"centreF": vec![250; 19]}}));
        assert_eq!(r.plan("CenterFrequencies", &resp).updates[0].0, "centerF");

        let resp = response(json!({"output_parameters": {"major": 2, "minor": 7}}));
        assert_eq!(r.plan("dllVersion", &resp).updates.len(), 2);
    }
}
