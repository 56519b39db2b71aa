mod common;

use common::{harness, ok, Reply};
use nal2_caller::bands::BandGrid;
use nal2_caller::commands::{apply_steps, fetch_corrections, push_corrections, send_raw, STEP_FUNCTIONS};
use nal2_caller::coordinator::{run_action, Action};
use nal2_caller::events::UiEvent;
use nal2_caller::session::ResponseEnvelope;
use serde_json::{json, Value};

fn cross_over() -> Vec<f64> {
    (0..19).map(|i| 100.0 + 250.0 * i as f64).collect()
}

fn fitting_service(req: &Value) -> Reply {
    match req["function"].as_str().unwrap_or_default() {
        "CrossOverFrequencies_NL2" => ok(req, json!({"CFArray": cross_over(), "FreqInCh": vec![1; 19]})),
        "CompressionThreshold_NL2" => ok(req, json!({"CT": vec![48.5; 19]})),
        "GetRECDh_indiv9_NL2" => ok(req, json!({"RECDh9": vec![1.0; 9]})),
        "GetRECDt_indiv9_NL2" => ok(req, json!({"RECDt": vec![2.0; 9]})),
        "GetREDDindiv9" => ok(req, json!({"REDD9": vec![3.0; 9]})),
        "GetREURindiv9" => ok(req, json!({"REUR9": vec![4.0; 9]})),
        _ => ok(req, json!({})),
    }
}

#[tokio::test]
async fn test_steps_run_in_order_and_feed_cross_over() {
    let mut h = harness(fitting_service).await;
    let done = apply_steps(h.coord.engine()).await.unwrap();
    assert_eq!(done, 8);
    assert_eq!(h.service.functions(), STEP_FUNCTIONS.to_vec());

    let sent = h.service.requests();
    let bwc = &sent[6].body["input_parameters"];
    assert_eq!(bwc["crossOver"], json!(cross_over()));
    assert_eq!(bwc["channels"], 18);

    let state = h.coord.engine().store().snapshot();
    assert_eq!(state.array("CT").unwrap(), vec![48.5; 19]);
    let events = h.coord.drain();
    assert!(matches!(events.last(), Some(UiEvent::OutputsChanged)));
}

#[tokio::test]
async fn test_steps_stop_at_first_failure() {
    let h = harness(|req| {
        if req["function"] == "SetTonalLanguage" {
            Reply::Status(503)
        } else {
            ok(req, json!({}))
        }
    })
    .await;
    let err = apply_steps(h.coord.engine()).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(h.service.functions(), STEP_FUNCTIONS[..4].to_vec());
}

#[tokio::test]
async fn test_fetch_audiometric_corrections() {
    let h = harness(fitting_service).await;
    let result = fetch_corrections(h.coord.engine(), BandGrid::Audiometric).await.unwrap();
    assert_eq!(result.completed.len(), 4);
    assert_eq!(result.updated, vec!["RECDh9", "RECDt9", "REDD9", "REUR9"]);

    let state = h.coord.engine().store().snapshot();
    assert_eq!(state.array("RECDt9").unwrap(), vec![2.0; 9]);
    assert_eq!(state.array("REUR9").unwrap(), vec![4.0; 9]);
    assert!(state.is_all_zero("REUR"), "the 19-band set is untouched");
}

#[tokio::test]
async fn test_push_sends_current_arrays() {
    let h = harness(fitting_service).await;
    let engine = h.coord.engine();
    engine.store().set_array("REUR9", &[6.0; 9]).unwrap();

    push_corrections(engine, BandGrid::Audiometric).await.unwrap();
    let sent = h.service.requests();
    assert_eq!(
        h.service.functions(),
        vec!["SetRECDh_indiv9_NL2", "SetRECDt_indiv9_NL2", "SetREDDindiv9", "SetREURindiv9"]
    );
    assert_eq!(sent[3].body["input_parameters"]["REUR9"], json!(vec![6.0; 9]));
}

#[tokio::test]
async fn test_push_refuses_bad_lengths_before_any_call() {
    let h = harness(fitting_service).await;
    let engine = h.coord.engine();
    engine.store().with_raw(|raw| {
        raw.insert("REDD".to_string(), json!([1.0, 2.0, 3.0]));
    });

    let err = push_corrections(engine, BandGrid::ThirdOctave).await.unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("REDD"));
    assert!(h.service.requests().is_empty());
    assert_eq!(engine.client().sequence(), 0);
}

#[tokio::test]
async fn test_send_raw_reconciles_and_reports() {
    let mut h = harness(|req| ok(req, json!({"MLE": vec![2.5; 19]}))).await;
    run_action(
        h.coord.engine(),
        Action::SendRaw(r#"{"function": "GetMLE", "input_parameters": {"aidType": 0, "direction": 0, "mic": 1}}"#.into()),
    )
    .await
    .unwrap();

    let sent = h.service.requests();
    assert_eq!(sent[0].body["input_parameters"], json!({"aidType": 0, "direction": 0, "mic": 1}));
    assert_eq!(sent[0].body["sequence_num"], 0);
    assert_eq!(h.coord.engine().store().read(|s| s.array("MLE").unwrap()), vec![2.5; 19]);

    let events = h.coord.drain();
    let preview = events.iter().find_map(|e| match e {
        UiEvent::RequestPreview(text) => Some(text.clone()),
        _ => None,
    });
    assert!(preview.unwrap().contains("\"sequence_num\": 0"));
    assert!(events.iter().any(|e| matches!(e, UiEvent::ResponseReady(text) if text.contains("MLE"))));
}

#[tokio::test]
async fn test_send_raw_rejects_malformed_text_without_calling() {
    let h = harness(fitting_service).await;
    let err = send_raw(h.coord.engine(), "{\"function\": \"GetMLE\"").await.unwrap_err();
    assert!(err.is_protocol());
    assert!(h.service.requests().is_empty());
}

#[tokio::test]
async fn test_reconciling_twice_is_idempotent() {
    let h = harness(fitting_service).await;
    let engine = h.coord.engine();
    let response: ResponseEnvelope = serde_json::from_value(json!({
        "function": "CompressionRatio_NL2",
        "output_parameters": {"CR": vec![1.8; 19], "unrelated": 4}
    }))
    .unwrap();

    let first = engine.reconciler().apply(engine.store(), "CompressionRatio_NL2", &response).unwrap();
    let after_first = engine.store().snapshot();
    let second = engine.reconciler().apply(engine.store(), "CompressionRatio_NL2", &response).unwrap();

    assert_eq!(first.updated, vec!["CR"]);
    assert_eq!(second.updated, first.updated);
    assert_eq!(engine.store().snapshot(), after_first);
}
