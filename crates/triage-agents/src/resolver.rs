//! Duplicate resolution against the team's active issues.
//!
//! Fails open: if the active list cannot be fetched or the matching exchange
//! yields nothing usable, [`DuplicateResolver::resolve`] returns `None` and
//! the orchestrator files a new issue.

use std::sync::Arc;

use serde::Deserialize;
use tracker::{Issue, IssueTracker};

use crate::classifier::NewIssueDraft;
use crate::engine::{ClassificationEngine, ClassificationResult, ISSUE_MATCHING};
use crate::errors::EngineError;
use crate::prompts::{self, ComparisonField};

/// Whether a draft is new, or extends an existing issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDecision {
    NewIssue,
    Existing { issue_id: String, comment: String },
}

impl MatchDecision {
    pub fn is_new_issue(&self) -> bool {
        matches!(self, Self::NewIssue)
    }
}

#[derive(Debug, Deserialize)]
struct MatchArgs {
    is_new_issue: bool,
    #[serde(default)]
    old_issue_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl MatchDecision {
    /// Interpret a matching result against the issues that were offered.
    ///
    /// An `old_issue_id` that was not in the prompt is a schema violation.
    fn from_result(result: &ClassificationResult, offered: &[Issue]) -> Result<Self, EngineError> {
        let args: MatchArgs = result.parse()?;
        if args.is_new_issue {
            return Ok(Self::NewIssue);
        }

        let issue_id = args
            .old_issue_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EngineError::schema("match is missing 'old_issue_id'"))?;
        let comment = args
            .description
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| EngineError::schema("match is missing comment 'description'"))?;

        if !offered.iter().any(|issue| issue.id == issue_id) {
            return Err(EngineError::schema(format!(
                "matched issue '{issue_id}' is not an active issue"
            )));
        }

        Ok(Self::Existing { issue_id, comment })
    }
}

/// Compares a new draft with every active issue via the matching exchange.
pub struct DuplicateResolver {
    engine: Arc<dyn ClassificationEngine>,
    tracker: Arc<dyn IssueTracker>,
    field: ComparisonField,
}

impl DuplicateResolver {
    pub fn new(
        engine: Arc<dyn ClassificationEngine>,
        tracker: Arc<dyn IssueTracker>,
        field: ComparisonField,
    ) -> Self {
        Self {
            engine,
            tracker,
            field,
        }
    }

    /// Decide new-vs-existing for `draft`, or `None` if no comparison was possible.
    pub async fn resolve(&self, draft: &NewIssueDraft) -> Option<MatchDecision> {
        let issues = match self.tracker.list_active_issues().await {
            Ok(issues) => issues,
            Err(e) => {
                tracing::warn!(error = %e, "could not list active issues");
                return None;
            }
        };

        if issues.is_empty() {
            tracing::debug!("no active issues; draft is new");
            return Some(MatchDecision::NewIssue);
        }

        let prompt = prompts::comparison_prompt(&issues, draft, self.field);
        tracing::debug!(
            active = issues.len(),
            prompt_version = prompts::PROMPT_VERSION,
            "comparing draft with active issues"
        );

        let decision = self
            .engine
            .classify(&prompt, &ISSUE_MATCHING)
            .await
            .and_then(|result| MatchDecision::from_result(&result, &issues));

        match decision {
            Ok(decision) => Some(decision),
            Err(e) => {
                tracing::warn!(error = %e, class = %e.class(), "issue matching produced no result");
                None
            }
        }
    }
}
