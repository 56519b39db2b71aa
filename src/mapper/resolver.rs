//! Turns a function descriptor plus the current Fit State into `input_parameters`.

use serde_json::{json, Map, Value};

use crate::catalog::FunctionDescriptor;
use crate::fit_state::compact::compact_numeric_arrays;
use crate::fit_state::FitState;
use crate::session::pretty;

/// State field a parameter is read from. Two parameters are named after
/// the service's argument rather than the output they carry.
pub fn source_field(param: &str) -> &str {
    match param {
        "crossOver" => "CFArray",
        "centreFreq" => "centerF",
        other => other,
    }
}

/// One entry per declared parameter, in declaration order. Fields the state
/// does not hold resolve to `null` and are still sent.
pub fn resolve(descriptor: &FunctionDescriptor, state: &FitState) -> Map<String, Value> {
    descriptor
        .params
        .iter()
        .map(|p| {
            let value = state.get(source_field(p)).cloned().unwrap_or(Value::Null);
            (p.clone(), value)
        })
        .collect()
}

/// Like [`resolve`], with per-call values replacing resolved ones. Overrides
/// for parameters the descriptor does not declare are ignored.
pub fn resolve_with(
    descriptor: &FunctionDescriptor,
    state: &FitState,
    overrides: &Map<String, Value>,
) -> Map<String, Value> {
    let mut params = resolve(descriptor, state);
    for (key, value) in overrides {
        if let Some(slot) = params.get_mut(key) {
            *slot = value.clone();
        }
    }
    params
}

/// Request text for the manual editor: `{function, input_parameters}`.
pub fn preview_request(descriptor: &FunctionDescriptor, state: &FitState) -> String {
    let body = json!({
        "function": descriptor.function,
        "input_parameters": resolve(descriptor, state),
    });
    compact_numeric_arrays(&pretty(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(function: &str, params: &[&str]) -> FunctionDescriptor {
        FunctionDescriptor {
            label: function.to_string(),
            function: function.to_string(),
            params: params.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_renamed_params_read_outputs() {
        let mut state = FitState::default();
        state.set_array("CFArray", &[1000.0; 19]).unwrap();
        state.set_array("centerF", &[500.0; 19]).unwrap();

        let bwc = resolve(&descriptor("setBWC", &["channels", "crossOver"]), &state);
        assert_eq!(bwc.keys().collect::<Vec<_>>(), vec!["channels", "crossOver"]);
        assert_eq!(bwc["crossOver"], Value::from(vec![1000.0; 19]));

        let cr = resolve(&descriptor("CompressionRatio_NL2", &["centreFreq"]), &state);
        assert_eq!(cr["centreFreq"], Value::from(vec![500; 19]));
    }

    #[test]
    fn test_missing_field_is_null() {
        let state = FitState::default();
        let p = resolve(&descriptor("Get_SII", &["nCompSpeed", "s"]), &state);
        assert_eq!(p["nCompSpeed"], Value::Null);
        assert_eq!(p["s"], Value::from(2));
    }

    #[test]
    fn test_resolve_is_pure() {
        let state = FitState::default();
        let d = descriptor("RealEarAidedGain_NL2", &["AC", "BC", "L"]);
        assert_eq!(resolve(&d, &state), resolve(&d, &state));
    }

    #[test]
    fn test_overrides_only_declared_params() {
        let state = FitState::default();
        let d = descriptor("GainAt_NL2", &["freqRequired", "L"]);
        let mut o = Map::new();
        o.insert("freqRequired".into(), Value::from(4));
        o.insert("extra".into(), Value::from(1));
        let p = resolve_with(&d, &state, &o);
        assert_eq!(p["freqRequired"], Value::from(4));
        assert_eq!(p["L"], Value::from(65));
        assert!(!p.contains_key("extra"));
    }

    #[test]
    fn test_preview_parses_back() {
        let state = FitState::default();
        let text = preview_request(&descriptor("GetMLE", &["aidType", "mic"]), &state);
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["function"], "GetMLE");
        assert_eq!(v["input_parameters"]["aidType"], 3);
    }
}
