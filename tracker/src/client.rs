//! Linear GraphQL client and the `IssueTracker` seam.
//!
//! All operations go through one POST endpoint. A non-200 status, a GraphQL
//! `errors` array, or a mutation reporting `success: false` is surfaced as a
//! [`TrackerError`]; callers decide whether that is fatal.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{TrackerError, TrackerResult};
use crate::queries;
use crate::types::{Issue, Label, TeamId};

/// Public Linear GraphQL endpoint.
pub const DEFAULT_LINEAR_ENDPOINT: &str = "https://api.linear.app/graphql";

/// Read/write operations the triage pipeline needs from a ticket backend.
///
/// Implemented by [`LinearClient`]; tests substitute recording doubles.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Resolve a label id by exact name ("Feature", "Bug").
    async fn resolve_label_id(&self, name: &str) -> TrackerResult<String>;

    /// File a new issue in the team. Returns the new issue id.
    async fn create_issue(
        &self,
        title: &str,
        description: &str,
        label_id: Option<&str>,
    ) -> TrackerResult<String>;

    /// Append a comment to an existing issue.
    async fn add_comment(&self, issue_id: &str, body: &str) -> TrackerResult<()>;

    /// All active issues for the team, in backend order.
    async fn list_active_issues(&self) -> TrackerResult<Vec<Issue>>;
}

/// Connection settings for [`LinearClient`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// GraphQL endpoint URL.
    pub endpoint: String,
    /// Personal API key, sent verbatim in the `Authorization` header.
    pub api_key: String,
    /// Team to file into, by name. `None` picks the first team returned.
    pub team: Option<String>,
    /// Upper bound on issues fetched by `list_active_issues`.
    pub max_active_issues: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl TrackerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_LINEAR_ENDPOINT.to_string(),
            api_key: api_key.into(),
            team: None,
            max_active_issues: 250,
            timeout: Duration::from_secs(30),
        }
    }
}

// ── Wire envelope ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PagedConnection<T> {
    nodes: Vec<T>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct TeamNode {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TeamsData {
    teams: Connection<TeamNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelsData {
    issue_labels: Connection<Label>,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IssueCreatePayload {
    success: bool,
    issue: Option<CreatedIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueCreateData {
    issue_create: IssueCreatePayload,
}

#[derive(Debug, Deserialize)]
struct CommentCreatePayload {
    success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentCreateData {
    comment_create: CommentCreatePayload,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: PagedConnection<Issue>,
}

// ── Transport ─────────────────────────────────────────────────────────

/// POSTs GraphQL documents and unwraps the `{data, errors}` envelope.
struct GraphQlTransport {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GraphQlTransport {
    fn new(config: &TrackerConfig) -> TrackerResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
    ) -> TrackerResult<T> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", &self.api_key)
            .json(&json!({
                "query": query,
                "operationName": operation,
                "variables": variables,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != reqwest::StatusCode::OK {
            return Err(TrackerError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| TrackerError::Decode {
                operation,
                message: e.to_string(),
            })?;

        if !envelope.errors.is_empty() {
            return Err(TrackerError::GraphQl {
                operation,
                messages: envelope.errors.into_iter().map(|e| e.message).collect(),
            });
        }

        envelope.data.ok_or_else(|| TrackerError::Decode {
            operation,
            message: "response has no data".to_string(),
        })
    }
}

// ── Client ────────────────────────────────────────────────────────────

/// Team-scoped Linear client.
///
/// The team id is resolved once in [`LinearClient::connect`] and never
/// changes for the lifetime of the client. Label ids are cached per client,
/// so repeated lookups within one run hit the backend once.
pub struct LinearClient {
    transport: GraphQlTransport,
    team_id: TeamId,
    max_active_issues: usize,
    label_cache: Mutex<HashMap<String, String>>,
}

impl LinearClient {
    /// Build the client and resolve the team id.
    pub async fn connect(config: TrackerConfig) -> TrackerResult<Self> {
        let transport = GraphQlTransport::new(&config)?;
        let team_id = Self::resolve_team_id(&transport, config.team.as_deref()).await?;
        tracing::info!(team_id = %team_id, "Linear team resolved");

        Ok(Self {
            transport,
            team_id,
            max_active_issues: config.max_active_issues,
            label_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    async fn resolve_team_id(
        transport: &GraphQlTransport,
        team: Option<&str>,
    ) -> TrackerResult<TeamId> {
        let data: TeamsData = transport
            .execute(queries::TEAMS_OP, queries::TEAMS, json!({}))
            .await?;

        let node = match team {
            Some(name) => data.teams.nodes.into_iter().find(|t| t.name == name),
            None => data.teams.nodes.into_iter().next(),
        };

        node.map(|t| TeamId(t.id)).ok_or_else(|| {
            TrackerError::NotFound(match team {
                Some(name) => format!("team '{name}'"),
                None => "team".to_string(),
            })
        })
    }

    fn cached_label(&self, name: &str) -> Option<String> {
        self.label_cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(name).cloned())
    }
}

#[async_trait]
impl IssueTracker for LinearClient {
    async fn resolve_label_id(&self, name: &str) -> TrackerResult<String> {
        if let Some(id) = self.cached_label(name) {
            return Ok(id);
        }

        let data: LabelsData = self
            .transport
            .execute(
                queries::ISSUE_LABELS_OP,
                queries::ISSUE_LABELS,
                json!({ "name": name }),
            )
            .await?;

        let label = data
            .issue_labels
            .nodes
            .into_iter()
            .next()
            .ok_or_else(|| TrackerError::NotFound(format!("label '{name}'")))?;

        if let Ok(mut cache) = self.label_cache.lock() {
            cache.insert(name.to_string(), label.id.clone());
        }
        tracing::debug!(label = name, id = %label.id, "label resolved");
        Ok(label.id)
    }

    async fn create_issue(
        &self,
        title: &str,
        description: &str,
        label_id: Option<&str>,
    ) -> TrackerResult<String> {
        let mut input = json!({
            "title": title,
            "description": description,
            "teamId": self.team_id.as_str(),
        });
        if let Some(label_id) = label_id {
            input["labelIds"] = json!([label_id]);
        }

        let data: IssueCreateData = self
            .transport
            .execute(
                queries::ISSUE_CREATE_OP,
                queries::ISSUE_CREATE,
                json!({ "input": input }),
            )
            .await?;

        match data.issue_create {
            IssueCreatePayload {
                success: true,
                issue: Some(issue),
            } => Ok(issue.id),
            _ => Err(TrackerError::Rejected(queries::ISSUE_CREATE_OP)),
        }
    }

    async fn add_comment(&self, issue_id: &str, body: &str) -> TrackerResult<()> {
        let data: CommentCreateData = self
            .transport
            .execute(
                queries::COMMENT_CREATE_OP,
                queries::COMMENT_CREATE,
                json!({ "input": { "issueId": issue_id, "body": body } }),
            )
            .await?;

        if data.comment_create.success {
            Ok(())
        } else {
            Err(TrackerError::Rejected(queries::COMMENT_CREATE_OP))
        }
    }

    async fn list_active_issues(&self) -> TrackerResult<Vec<Issue>> {
        let mut issues = Vec::new();
        let mut after: Option<String> = None;

        while issues.len() < self.max_active_issues {
            let first = (self.max_active_issues - issues.len()).min(queries::MAX_PAGE_SIZE);
            let data: IssuesData = self
                .transport
                .execute(
                    queries::ACTIVE_ISSUES_OP,
                    queries::ACTIVE_ISSUES,
                    json!({
                        "teamId": self.team_id.as_str(),
                        "first": first,
                        "after": after,
                    }),
                )
                .await?;

            let page = data.issues;
            issues.extend(page.nodes);

            match (page.page_info.has_next_page, page.page_info.end_cursor) {
                (true, Some(cursor)) => after = Some(cursor),
                _ => break,
            }
        }

        issues.truncate(self.max_active_issues);
        tracing::debug!(count = issues.len(), "active issues fetched");
        Ok(issues)
    }
}
