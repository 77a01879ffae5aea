//! Assistants engine against a mock OpenAI server.

use std::time::Duration;

use serde_json::{json, Value};
use triage_agents::engine::{ISSUE_MATCHING, SCRIPT_PROCESSING};
use triage_agents::errors::FailureClass;
use triage_agents::{AssistantsEngine, ClassificationEngine, EngineConfig, EngineError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer) -> AssistantsEngine {
    let mut config = EngineConfig::new("sk-test");
    config.base_url = server.uri();
    config.poll_interval = Duration::from_millis(10);
    config.run_timeout = Duration::from_millis(200);
    config.request_timeout = Duration::from_secs(5);
    AssistantsEngine::new(config).unwrap()
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Assistant, thread, message and run creation. The run starts queued.
async fn mount_acquisition(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/assistants"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .respond_with(ok(json!({ "id": "asst_1" })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ok(json!({ "id": "thread_1" })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/messages"))
        .and(body_partial_json(json!({ "role": "user" })))
        .respond_with(ok(json!({ "id": "msg_1" })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs"))
        .and(body_partial_json(json!({ "assistant_id": "asst_1" })))
        .respond_with(ok(json!({ "id": "run_1", "status": "queued" })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_run_state(server: &MockServer, run: Value) {
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ok(run))
        .mount(server)
        .await;
}

async fn expect_cancel(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs/run_1/cancel"))
        .respond_with(ok(json!({ "id": "run_1", "status": "cancelling" })))
        .expect(times)
        .mount(server)
        .await;
}

async fn expect_thread_deleted(server: &MockServer, times: u64) {
    Mock::given(method("DELETE"))
        .and(path("/threads/thread_1"))
        .respond_with(ok(json!({ "id": "thread_1", "deleted": true })))
        .expect(times)
        .mount(server)
        .await;
}

async fn expect_assistant_deleted(server: &MockServer) {
    Mock::given(method("DELETE"))
        .and(path("/assistants/asst_1"))
        .respond_with(ok(json!({ "id": "asst_1", "deleted": true })))
        .expect(1)
        .mount(server)
        .await;
}

fn requires_action(function: &str, arguments: Value) -> Value {
    json!({
        "id": "run_1",
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_outputs",
            "submit_tool_outputs": { "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": { "name": function, "arguments": arguments.to_string() }
            }] }
        }
    })
}

#[tokio::test]
async fn structured_call_is_returned_and_resources_released() {
    let server = MockServer::start().await;
    mount_acquisition(&server).await;
    mount_run_state(
        &server,
        requires_action(
            "invoke_linear_api",
            json!({
                "request_type": "feature",
                "name": "Project Dashboard",
                "description": "Dashboard of ongoing projects"
            }),
        ),
    )
    .await;
    expect_cancel(&server, 1).await;
    expect_thread_deleted(&server, 1).await;
    expect_assistant_deleted(&server).await;

    let result = engine_for(&server)
        .classify("[C]: a dashboard please", &SCRIPT_PROCESSING)
        .await
        .unwrap();

    assert_eq!(result.get_str("request_type"), Some("feature"));
    assert_eq!(result.get_str("name"), Some("Project Dashboard"));
}

#[tokio::test]
async fn assistant_carries_schema_tool() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/assistants"))
        .and(body_partial_json(json!({
            "name": "Linear Issue Matching Assistant",
            "tools": [{ "type": "function", "function": { "name": "query_issues" } }]
        })))
        .respond_with(ok(json!({ "id": "asst_1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    expect_assistant_deleted(&server).await;

    let err = engine_for(&server)
        .classify("prompt", &ISSUE_MATCHING)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Status {
            operation: "create_thread",
            status: 500,
            ..
        }
    ));
    assert_eq!(err.class(), FailureClass::Transport);
}

#[tokio::test]
async fn completed_without_call_is_no_result() {
    let server = MockServer::start().await;
    mount_acquisition(&server).await;
    mount_run_state(&server, json!({ "id": "run_1", "status": "completed" })).await;
    expect_cancel(&server, 0).await;
    expect_thread_deleted(&server, 1).await;
    expect_assistant_deleted(&server).await;

    let err = engine_for(&server)
        .classify("prompt", &ISSUE_MATCHING)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NoStructuredCall));
    assert_eq!(err.class(), FailureClass::NoResult);
}

#[tokio::test]
async fn failed_run_reports_status() {
    let server = MockServer::start().await;
    mount_acquisition(&server).await;
    mount_run_state(
        &server,
        json!({
            "id": "run_1",
            "status": "failed",
            "last_error": { "code": "server_error", "message": "model overloaded" }
        }),
    )
    .await;
    expect_thread_deleted(&server, 1).await;
    expect_assistant_deleted(&server).await;

    let err = engine_for(&server)
        .classify("prompt", &ISSUE_MATCHING)
        .await
        .unwrap_err();

    match err {
        EngineError::RunFailed { status } => assert_eq!(status, "failed"),
        other => panic!("expected RunFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn pending_run_times_out_and_is_cancelled() {
    let server = MockServer::start().await;
    mount_acquisition(&server).await;
    mount_run_state(&server, json!({ "id": "run_1", "status": "in_progress" })).await;
    expect_cancel(&server, 1).await;
    expect_thread_deleted(&server, 1).await;
    expect_assistant_deleted(&server).await;

    let err = engine_for(&server)
        .classify("prompt", &ISSUE_MATCHING)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Timeout { .. }));
    assert_eq!(err.class(), FailureClass::NoResult);
}

#[tokio::test]
async fn wrong_function_is_schema_violation() {
    let server = MockServer::start().await;
    mount_acquisition(&server).await;
    mount_run_state(
        &server,
        requires_action("invoke_linear_api", json!({ "request_type": "bug" })),
    )
    .await;
    expect_cancel(&server, 1).await;
    expect_thread_deleted(&server, 1).await;
    expect_assistant_deleted(&server).await;

    let err = engine_for(&server)
        .classify("prompt", &ISSUE_MATCHING)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::SchemaViolation(_)));
}

#[tokio::test]
async fn cleanup_failure_does_not_mask_result() {
    let server = MockServer::start().await;
    mount_acquisition(&server).await;
    mount_run_state(
        &server,
        requires_action("query_issues", json!({ "is_new_issue": true })),
    )
    .await;
    expect_cancel(&server, 1).await;
    Mock::given(method("DELETE"))
        .and(path("/threads/thread_1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such thread"))
        .expect(1)
        .mount(&server)
        .await;
    expect_assistant_deleted(&server).await;

    let result = engine_for(&server)
        .classify("prompt", &ISSUE_MATCHING)
        .await
        .unwrap();

    assert_eq!(result.get_bool("is_new_issue"), Some(true));
}
