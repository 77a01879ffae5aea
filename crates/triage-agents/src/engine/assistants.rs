//! OpenAI Assistants (v2) implementation of [`ClassificationEngine`].
//!
//! ## Exchange lifecycle
//!
//! ```text
//! classify(prompt, schema)
//!   → POST /assistants                 - persona + one function tool from the schema
//!   → POST /threads                    - empty conversation context
//!   → POST /threads/{t}/messages       - prompt as a single user turn
//!   → POST /threads/{t}/runs           - bind the assistant
//!   → GET  /threads/{t}/runs/{r}       - every poll_interval until terminal or run_timeout
//!   → release:
//!       POST   /threads/{t}/runs/{r}/cancel   - only if the run is still open
//!       DELETE /threads/{t}
//!       DELETE /assistants/{a}
//! ```
//!
//! Release runs on every exit path, including failure part-way through
//! acquisition; it only touches what was actually created.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;

use super::schema::{ClassificationResult, ClassificationSchema};
use super::ClassificationEngine;
use crate::errors::EngineError;

/// Public OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Model used for both assistants unless overridden.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
/// Delay between run status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Maximum time a run may stay queued or in progress.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection and polling settings for [`AssistantsEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub poll_interval: Duration,
    pub run_timeout: Duration,
    /// Per-HTTP-request timeout.
    pub request_timeout: Duration,
}

impl EngineConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            run_timeout: DEFAULT_RUN_TIMEOUT,
            request_timeout: Duration::from_secs(60),
        }
    }
}

// ── Wire types ────────────────────────────────────────────────────────

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Other,
}

impl RunStatus {
    /// Still waiting on the engine.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
struct LastError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Run {
    id: String,
    status: RunStatus,
    #[serde(default)]
    required_action: Option<RequiredAction>,
    #[serde(default)]
    last_error: Option<LastError>,
}

// ── Exchange scope ────────────────────────────────────────────────────

/// Engine-side resources created by one exchange.
///
/// Filled in as each resource is created and drained by
/// [`AssistantsEngine::release`].
#[derive(Debug, Default)]
struct ExchangeScope {
    assistant_id: Option<String>,
    thread_id: Option<String>,
    /// Run that has not reached a closed state (pending or awaiting tool output).
    open_run_id: Option<String>,
}

impl Drop for ExchangeScope {
    fn drop(&mut self) {
        if self.assistant_id.is_some() || self.thread_id.is_some() {
            tracing::warn!(
                assistant = ?self.assistant_id,
                thread = ?self.thread_id,
                "exchange dropped before release; engine resources left behind"
            );
        }
    }
}

// ── Engine ────────────────────────────────────────────────────────────

/// Assistants-API backed classification engine.
pub struct AssistantsEngine {
    http: reqwest::Client,
    config: EngineConfig,
}

impl AssistantsEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, EngineError> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EngineError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| EngineError::Decode {
            operation,
            message: e.to_string(),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        body: Value,
    ) -> Result<T, EngineError> {
        self.send(operation, self.http.post(self.url(path)).json(&body))
            .await
    }

    async fn delete(&self, operation: &'static str, path: &str) -> Result<(), EngineError> {
        self.send::<Value>(operation, self.http.delete(self.url(path)))
            .await
            .map(|_| ())
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, EngineError> {
        self.send(
            "retrieve_run",
            self.http
                .get(self.url(&format!("/threads/{thread_id}/runs/{run_id}"))),
        )
        .await
    }

    /// Poll until the run leaves the pending states or the deadline passes.
    async fn wait_on_run(&self, thread_id: &str, mut run: Run) -> Result<Run, EngineError> {
        let started = Instant::now();
        let deadline = started + self.config.run_timeout;

        while run.status.is_pending() {
            if Instant::now() >= deadline {
                return Err(EngineError::Timeout {
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
            run = self.retrieve_run(thread_id, &run.id).await?;
            tracing::debug!(run = %run.id, status = %run.status, "run polled");
        }

        Ok(run)
    }

    /// Acquire resources, run the exchange, and interpret the terminal run.
    async fn exchange(
        &self,
        scope: &mut ExchangeScope,
        prompt: &str,
        schema: &ClassificationSchema,
    ) -> Result<ClassificationResult, EngineError> {
        let assistant: Created = self
            .post(
                "create_assistant",
                "/assistants",
                json!({
                    "name": schema.assistant_name,
                    "instructions": schema.instructions,
                    "model": self.config.model,
                    "tools": [schema.tool_definition()],
                }),
            )
            .await?;
        scope.assistant_id = Some(assistant.id.clone());

        let thread: Created = self.post("create_thread", "/threads", json!({})).await?;
        scope.thread_id = Some(thread.id.clone());

        let _: Value = self
            .post(
                "create_message",
                &format!("/threads/{}/messages", thread.id),
                json!({ "role": "user", "content": prompt }),
            )
            .await?;

        let run: Run = self
            .post(
                "create_run",
                &format!("/threads/{}/runs", thread.id),
                json!({ "assistant_id": assistant.id }),
            )
            .await?;
        scope.open_run_id = Some(run.id.clone());
        tracing::debug!(
            assistant = schema.assistant_name,
            thread = %thread.id,
            run = %run.id,
            "classification run started"
        );

        let run = self.wait_on_run(&thread.id, run).await?;
        if run.status != RunStatus::RequiresAction {
            scope.open_run_id = None;
        }

        match run.status {
            RunStatus::RequiresAction => Self::structured_arguments(run, schema),
            RunStatus::Completed => Err(EngineError::NoStructuredCall),
            status => {
                if let Some(err) = &run.last_error {
                    tracing::warn!(run = %run.id, status = %status, error = %err.message, "run ended without result");
                }
                Err(EngineError::RunFailed {
                    status: status.to_string(),
                })
            }
        }
    }

    /// First tool call's arguments, validated against `schema`.
    fn structured_arguments(
        run: Run,
        schema: &ClassificationSchema,
    ) -> Result<ClassificationResult, EngineError> {
        let mut calls = run
            .required_action
            .map(|a| a.submit_tool_outputs.tool_calls)
            .unwrap_or_default();
        if calls.is_empty() {
            return Err(EngineError::NoStructuredCall);
        }
        if calls.len() > 1 {
            tracing::debug!(
                run = %run.id,
                extra = calls.len() - 1,
                "ignoring additional tool calls"
            );
        }

        let call = calls.swap_remove(0);
        if call.function.name != schema.function_name {
            return Err(EngineError::schema(format!(
                "expected call to '{}', got '{}'",
                schema.function_name, call.function.name
            )));
        }

        let arguments: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
            EngineError::schema(format!("{}: arguments are not JSON: {e}", schema.function_name))
        })?;
        schema.validate(arguments)
    }

    /// Tear down everything `scope` holds. Failures are logged, never returned.
    async fn release(&self, mut scope: ExchangeScope) {
        if let (Some(thread_id), Some(run_id)) = (scope.thread_id.as_deref(), scope.open_run_id.take()) {
            let cancelled: Result<Value, _> = self
                .post(
                    "cancel_run",
                    &format!("/threads/{thread_id}/runs/{run_id}/cancel"),
                    json!({}),
                )
                .await;
            if let Err(e) = cancelled {
                tracing::debug!(run = %run_id, error = %e, "run cancel failed");
            }
        }

        if let Some(thread_id) = scope.thread_id.take() {
            if let Err(e) = self
                .delete("delete_thread", &format!("/threads/{thread_id}"))
                .await
            {
                tracing::warn!(thread = %thread_id, error = %e, "failed to delete thread");
            }
        }

        if let Some(assistant_id) = scope.assistant_id.take() {
            if let Err(e) = self
                .delete("delete_assistant", &format!("/assistants/{assistant_id}"))
                .await
            {
                tracing::warn!(assistant = %assistant_id, error = %e, "failed to delete assistant");
            }
        }
    }
}

#[async_trait]
impl ClassificationEngine for AssistantsEngine {
    async fn classify(
        &self,
        prompt: &str,
        schema: &ClassificationSchema,
    ) -> Result<ClassificationResult, EngineError> {
        let mut scope = ExchangeScope::default();
        let result = self.exchange(&mut scope, prompt, schema).await;
        self.release(scope).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::{ISSUE_MATCHING, SCRIPT_PROCESSING};

    fn run_from(value: Value) -> Run {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn unknown_status_deserializes_as_other() {
        let run = run_from(json!({ "id": "run_1", "status": "paused_for_review" }));
        assert_eq!(run.status, RunStatus::Other);
        assert!(!run.status.is_pending());
    }

    #[test]
    fn pending_states() {
        assert!(RunStatus::Queued.is_pending());
        assert!(RunStatus::InProgress.is_pending());
        assert!(RunStatus::Cancelling.is_pending());
        assert!(!RunStatus::RequiresAction.is_pending());
        assert!(!RunStatus::Expired.is_pending());
    }

    #[test]
    fn first_tool_call_wins() {
        let run = run_from(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": { "type": "submit_tool_outputs", "submit_tool_outputs": { "tool_calls": [
                { "id": "call_1", "type": "function", "function": {
                    "name": "query_issues", "arguments": "{\"is_new_issue\": true}" } },
                { "id": "call_2", "type": "function", "function": {
                    "name": "query_issues", "arguments": "{\"is_new_issue\": false}" } }
            ] } }
        }));
        let result = AssistantsEngine::structured_arguments(run, &ISSUE_MATCHING).unwrap();
        assert_eq!(result.get_bool("is_new_issue"), Some(true));
    }

    #[test]
    fn wrong_function_name_is_schema_violation() {
        let run = run_from(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": { "submit_tool_outputs": { "tool_calls": [
                { "function": { "name": "query_issues", "arguments": "{}" } }
            ] } }
        }));
        let err = AssistantsEngine::structured_arguments(run, &SCRIPT_PROCESSING).unwrap_err();
        assert!(matches!(err, EngineError::SchemaViolation(_)));
    }

    #[test]
    fn malformed_arguments_are_schema_violation() {
        let run = run_from(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": { "submit_tool_outputs": { "tool_calls": [
                { "function": { "name": "invoke_linear_api", "arguments": "{request_type: bug" } }
            ] } }
        }));
        let err = AssistantsEngine::structured_arguments(run, &SCRIPT_PROCESSING).unwrap_err();
        assert!(err.to_string().contains("arguments are not JSON"));
    }

    #[test]
    fn requires_action_without_calls_is_no_result() {
        let run = run_from(json!({ "id": "run_1", "status": "requires_action" }));
        let err = AssistantsEngine::structured_arguments(run, &SCRIPT_PROCESSING).unwrap_err();
        assert!(matches!(err, EngineError::NoStructuredCall));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let mut config = EngineConfig::new("sk-test");
        config.base_url = "http://localhost:9000/v1/".to_string();
        let engine = AssistantsEngine::new(config).unwrap();
        assert_eq!(engine.url("/threads"), "http://localhost:9000/v1/threads");
    }
}
