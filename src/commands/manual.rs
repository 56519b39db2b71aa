//! Sending request text the user typed or edited by hand.

use serde_json::{Map, Value};

use crate::curves::CurveEngine;
use crate::error::{CallerError, Result};
use crate::events::{emit, UiEvent};
use crate::fit_state::compact::compact_numeric_arrays;
use crate::mapper::ReconcileOutcome;
use crate::session::{pretty, RequestEnvelope, ResponseEnvelope};

/// A parsed manual request, not yet numbered.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualRequest {
    pub function: String,
    pub input_parameters: Map<String, Value>,
}

/// Parse request text: a JSON object with a string `function` and an object
/// `input_parameters`. Anything else is a protocol error.
pub fn parse_request(text: &str) -> Result<ManualRequest> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| CallerError::Protocol(format!("Request is not valid JSON: {}", e)))?;
    let obj = value
        .as_object()
        .ok_or_else(|| CallerError::Protocol("Request must be a JSON object".to_string()))?;
    let function = obj
        .get("function")
        .and_then(|f| f.as_str())
        .ok_or_else(|| CallerError::Protocol("Request needs a string 'function'".to_string()))?;
    let input_parameters = obj
        .get("input_parameters")
        .and_then(|p| p.as_object())
        .ok_or_else(|| CallerError::Protocol("Request needs an object 'input_parameters'".to_string()))?;
    Ok(ManualRequest {
        function: function.to_string(),
        input_parameters: input_parameters.clone(),
    })
}

/// Send request text as-is, reconcile the response and hand it back pretty-printed.
pub async fn send_raw(engine: &CurveEngine, text: &str) -> Result<(ResponseEnvelope, ReconcileOutcome)> {
    let request = parse_request(text)?;
    let events = engine.store().events();

    let preview = RequestEnvelope {
        function: request.function.clone(),
        input_parameters: request.input_parameters.clone(),
        sequence_num: engine.client().sequence(),
    };
    emit(events, UiEvent::RequestPreview(compact_numeric_arrays(&pretty(&preview))));

    let response = engine.exchange(&request.function, request.input_parameters).await?;
    let outcome = engine.reconciler().apply(engine.store(), &request.function, &response)?;
    emit(events, UiEvent::ResponseReady(pretty(&response)));
    Ok((response, outcome))
}
