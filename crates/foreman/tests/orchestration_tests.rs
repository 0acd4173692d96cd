//! Deterministic orchestration tests.
//!
//! These tests drive the full pipeline with ScriptedTransport and
//! FakeToolHandler to verify end-to-end flows without any network calls.

use std::sync::Arc;

use foreman::orchestrator::{
    FakeToolHandler, PlanPipeline, ScriptedReply, ScriptedTransport, ToolCatalog,
};
use foreman_common::{ForemanConfig, ForemanError, PipelineMode, PlanRequest};
use serde_json::{json, Value};

/// 1x1 transparent PNG, wrapped the way a browser canvas exports it.
const TINY_PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

fn stub_steps_json(count: usize) -> String {
    let steps: Vec<Value> = (1..=count)
        .map(|i| {
            json!({
                "sequence": i,
                "target_label": format!("GPIO Pin {}", i),
                "required_value": "220 ohm resistor",
                "correct_target": format!("Pin {}", i),
                "unsafe_alternative": "5V Pin",
                "rationale_text": "This protects the LED from excess current.",
                "warning_text": "The 5V pin would destroy the LED instantly.",
                "diagram_url": if i == 1 { "https://pinout.example/pi4" } else { "" },
                "requires_verification": true,
                "verification_criteria": "Photo shows the wire seated on the pin"
            })
        })
        .collect();
    json!({ "steps": steps }).to_string()
}

fn two_stage_config() -> ForemanConfig {
    ForemanConfig {
        mode: PipelineMode::TwoStage,
        tool_use: false,
        plan_length: 5,
        retry_base_delay_ms: 1,
        ..ForemanConfig::default()
    }
}

fn combined_config(tool_use: bool) -> ForemanConfig {
    ForemanConfig {
        mode: PipelineMode::Combined,
        tool_use,
        plan_length: 6,
        retry_base_delay_ms: 1,
        ..ForemanConfig::default()
    }
}

fn search_catalog() -> (ToolCatalog, Arc<FakeToolHandler>) {
    let handler = Arc::new(FakeToolHandler::new(
        "web_search",
        r#"{"url":"https://pinout.example/pi4","title":"Pi 4 pinout","snippet":"GPIO map"}"#,
    ));
    let mut catalog = ToolCatalog::new();
    catalog.register(handler.clone());
    (catalog, handler)
}

fn plan_request() -> PlanRequest {
    PlanRequest {
        image_data: TINY_PNG_DATA_URL.to_string(),
        user_goal: "Blink an LED".to_string(),
    }
}

// ============================================================================
// Two-Stage Pipeline Tests
// ============================================================================

/// The canonical two-stage non-tool scenario: stubbed vision description and
/// a stubbed 5-step plan come back as exactly 5 steps, order preserved.
#[tokio::test]
async fn test_two_stage_pipeline_end_to_end() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(ScriptedReply::content(
                "Raspberry Pi 4, unpowered, GPIO header visible",
            ))
            .reply(ScriptedReply::content(&stub_steps_json(5))),
    );
    let (catalog, handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(two_stage_config(), transport.clone(), catalog);

    let steps = pipeline.run(&plan_request()).await.unwrap();

    assert_eq!(steps.len(), 5);
    for (index, step) in steps.iter().enumerate() {
        assert_eq!(step.sequence, (index + 1) as u32);
        assert_eq!(step.target_label, format!("GPIO Pin {}", index + 1));
    }
    assert_eq!(steps[0].diagram_url, "https://pinout.example/pi4");
    assert_eq!(steps[1].diagram_url, "");

    // Two model calls, zero tool dispatches.
    assert_eq!(transport.call_count(), 2);
    assert_eq!(handler.call_count(), 0);
}

/// The identify call goes to the vision model with the image inlined; the
/// planning call goes to the text model with the description embedded and the
/// strict schema attached.
#[tokio::test]
async fn test_two_stage_pipeline_call_shapes() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(ScriptedReply::content("Arduino Uno, USB port visible"))
            .reply(ScriptedReply::content(&stub_steps_json(5))),
    );
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(two_stage_config(), transport.clone(), catalog);

    pipeline.run(&plan_request()).await.unwrap();

    let vision_call = transport.request_at(0);
    assert_eq!(vision_call.model, "gpt-4o");
    assert!(vision_call.response_format.is_none());
    let vision_json = serde_json::to_value(&vision_call).unwrap();
    assert_eq!(
        vision_json["messages"][1]["content"][1]["image_url"]["url"],
        Value::from(TINY_PNG_DATA_URL)
    );

    let plan_call = transport.request_at(1);
    assert_eq!(plan_call.model, "gpt-4o-mini");
    assert!(plan_call.tools.is_none());
    assert!(plan_call.response_format.is_some());
    let plan_json = serde_json::to_value(&plan_call).unwrap();
    assert!(plan_json["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("Arduino Uno"));
}

/// A transient vision failure is retried and the request still succeeds.
#[tokio::test]
async fn test_two_stage_pipeline_retries_transient_failure() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(ScriptedReply::server_error(503))
            .reply(ScriptedReply::content("Raspberry Pi 4, unpowered"))
            .reply(ScriptedReply::content(&stub_steps_json(5))),
    );
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(two_stage_config(), transport.clone(), catalog);

    let steps = pipeline.run(&plan_request()).await.unwrap();
    assert_eq!(steps.len(), 5);
    assert_eq!(transport.call_count(), 3);
}

// ============================================================================
// Combined Pipeline Tests
// ============================================================================

/// The plain single request/response planning call with tools disabled is the
/// simplest valid path and succeeds end-to-end.
#[tokio::test]
async fn test_combined_pipeline_without_tools() {
    let transport =
        Arc::new(ScriptedTransport::new().reply(ScriptedReply::content(&stub_steps_json(6))));
    let (catalog, handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(combined_config(false), transport.clone(), catalog);

    let steps = pipeline.run(&plan_request()).await.unwrap();

    assert_eq!(steps.len(), 6);
    assert_eq!(transport.call_count(), 1);
    assert_eq!(handler.call_count(), 0);

    let call = transport.request_at(0);
    assert!(call.tools.is_none());
    assert!(call.response_format.is_some());
}

/// Tool-augmented combined mode: one search round, then the strict-schema
/// finalization produces the plan.
#[tokio::test]
async fn test_combined_pipeline_with_tool_round() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(ScriptedReply::tool_call(
                "call_1",
                "web_search",
                r#"{"query":"Raspberry Pi 4 GPIO pinout diagram"}"#,
            ))
            .reply(ScriptedReply::content("Found the diagram, plan is ready."))
            .reply(ScriptedReply::content(&stub_steps_json(6))),
    );
    let (catalog, handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(combined_config(true), transport.clone(), catalog);

    let steps = pipeline.run(&plan_request()).await.unwrap();

    assert_eq!(steps.len(), 6);
    assert_eq!(handler.call_count(), 1);
    assert_eq!(
        handler.last_arguments().unwrap(),
        r#"{"query":"Raspberry Pi 4 GPIO pinout diagram"}"#
    );
    // Two loop rounds plus the finalize call.
    assert_eq!(transport.call_count(), 3);
}

/// A model that never stops requesting tools exhausts the iteration budget.
#[tokio::test]
async fn test_combined_pipeline_tool_loop_exhaustion() {
    let transport = Arc::new(ScriptedTransport::new().repeat(ScriptedReply::tool_call(
        "call_n",
        "web_search",
        r#"{"query":"one more thing"}"#,
    )));
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(combined_config(true), transport.clone(), catalog);

    let err = pipeline.run(&plan_request()).await.unwrap_err();
    assert!(matches!(
        err,
        ForemanError::ToolLoopExceeded { iterations: 10 }
    ));
    assert_eq!(transport.call_count(), 10);
}

// ============================================================================
// Input Validation Tests
// ============================================================================

/// Invalid input fails before any model call is made.
#[tokio::test]
async fn test_empty_goal_rejected_without_model_call() {
    let transport = Arc::new(ScriptedTransport::new());
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(combined_config(false), transport.clone(), catalog);

    let request = PlanRequest {
        image_data: TINY_PNG_DATA_URL.to_string(),
        user_goal: "  \n ".to_string(),
    };
    let err = pipeline.run(&request).await.unwrap_err();

    assert!(matches!(err, ForemanError::InvalidGoal(_)));
    assert_eq!(err.status_code(), 400);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_oversized_goal_rejected() {
    let transport = Arc::new(ScriptedTransport::new());
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(combined_config(false), transport.clone(), catalog);

    let request = PlanRequest {
        image_data: TINY_PNG_DATA_URL.to_string(),
        user_goal: "x".repeat(501),
    };
    let err = pipeline.run(&request).await.unwrap_err();
    assert!(matches!(err, ForemanError::InvalidGoal(_)));
}

#[tokio::test]
async fn test_undersized_image_rejected() {
    let transport = Arc::new(ScriptedTransport::new());
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(combined_config(false), transport.clone(), catalog);

    let request = PlanRequest {
        image_data: "aGVsbG8=".to_string(),
        user_goal: "Blink an LED".to_string(),
    };
    let err = pipeline.run(&request).await.unwrap_err();

    assert!(matches!(err, ForemanError::InvalidImageData(_)));
    assert_eq!(transport.call_count(), 0);
}

// ============================================================================
// Error Propagation Tests
// ============================================================================

/// An upstream rejection surfaces unchanged in kind, with no retry.
#[tokio::test]
async fn test_client_error_propagates_without_retry() {
    let transport = Arc::new(
        ScriptedTransport::new().reply(ScriptedReply::client_error(401, "invalid api key")),
    );
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(two_stage_config(), transport.clone(), catalog);

    let err = pipeline.run(&plan_request()).await.unwrap_err();

    match err {
        ForemanError::UpstreamClientError { status, ref detail } => {
            assert_eq!(status, 401);
            assert!(detail.contains("invalid api key"));
        }
        ref other => panic!("expected client error, got {:?}", other),
    }
    assert_eq!(err.status_code(), 503);
    assert_eq!(transport.call_count(), 1);
}

/// Unparseable final output is a malformed-output failure carrying a snippet.
#[tokio::test]
async fn test_malformed_plan_output_propagates() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(ScriptedReply::content("Raspberry Pi 4, unpowered"))
            .reply(ScriptedReply::content("sorry, here is prose instead of JSON")),
    );
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(two_stage_config(), transport, catalog);

    let err = pipeline.run(&plan_request()).await.unwrap_err();
    match err {
        ForemanError::MalformedModelOutput { snippet, .. } => {
            assert!(snippet.contains("prose"))
        }
        other => panic!("expected malformed output, got {:?}", other),
    }
}

/// A structurally wrong plan names the first offending field.
#[tokio::test]
async fn test_schema_violation_names_field() {
    let mut doc: Value = serde_json::from_str(&stub_steps_json(5)).unwrap();
    doc["steps"][2]
        .as_object_mut()
        .unwrap()
        .remove("target_label");

    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(ScriptedReply::content("Raspberry Pi 4, unpowered"))
            .reply(ScriptedReply::content(&doc.to_string())),
    );
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(two_stage_config(), transport, catalog);

    let err = pipeline.run(&plan_request()).await.unwrap_err();
    match err {
        ForemanError::SchemaValidationFailed { field, .. } => {
            assert_eq!(field, "steps[2].target_label")
        }
        other => panic!("expected schema failure, got {:?}", other),
    }
}

/// An empty vision reply is a malformed-output failure, not a silent empty
/// description fed to stage 2.
#[tokio::test]
async fn test_empty_vision_reply_fails() {
    let transport =
        Arc::new(ScriptedTransport::new().reply(ScriptedReply::content("   ")));
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(two_stage_config(), transport.clone(), catalog);

    let err = pipeline.run(&plan_request()).await.unwrap_err();
    assert!(matches!(err, ForemanError::MalformedModelOutput { .. }));
    assert_eq!(transport.call_count(), 1);
}

// ============================================================================
// Secondary Operation Tests
// ============================================================================

/// The chronological task plan operation validates against its own schema.
#[tokio::test]
async fn test_generate_task_plan() {
    let plan_doc = json!({
        "identified_component": "Raspberry Pi 4",
        "component_state": "unpowered",
        "goal": "Blink an LED",
        "plan_steps": [{
            "step_number": 1,
            "action": "Connect the resistor to GPIO 17",
            "component": "220 ohm resistor",
            "safety_level": "safe",
            "estimated_time_seconds": 60
        }],
        "common_errors": [{
            "error_name": "LED does not light",
            "symptoms": ["No light after power on"],
            "recovery_steps": ["Check LED polarity"]
        }],
        "total_estimated_time_seconds": 60
    });
    let transport =
        Arc::new(ScriptedTransport::new().reply(ScriptedReply::content(&plan_doc.to_string())));
    let (catalog, _handler) = search_catalog();
    let pipeline = PlanPipeline::with_parts(combined_config(false), transport.clone(), catalog);

    let plan = pipeline
        .generate_task_plan("Raspberry Pi 4", "unpowered", "Blink an LED")
        .await
        .unwrap();

    assert_eq!(plan.identified_component, "Raspberry Pi 4");
    assert_eq!(plan.plan_steps.len(), 1);

    let call = transport.request_at(0);
    assert_eq!(call.model, "gpt-4o-mini");
    assert!(call.response_format.is_some());
}
