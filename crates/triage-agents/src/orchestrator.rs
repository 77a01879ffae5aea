//! Transcript → ticket pipeline.
//!
//! ```text
//! process(transcript)
//!   → TranscriptClassifier::classify      - neither / failure ends the run, no write
//!   → DuplicateResolver::resolve          - None means "could not compare"
//!   → exactly one write:
//!       None                 → create issue (fallback)
//!       NewIssue             → create issue
//!       Existing{id,comment} → add comment
//! ```
//!
//! Failures never escape `process`; they end up in the returned
//! [`PipelineOutcome`] and in the log.

use std::sync::Arc;
use std::time::Instant;

use tracker::IssueTracker;

use crate::classifier::{Classification, NewIssueDraft, TranscriptClassifier};
use crate::engine::ClassificationEngine;
use crate::prompts::ComparisonField;
use crate::resolver::{DuplicateResolver, MatchDecision};
use crate::telemetry::{RunMetrics, Stage};

/// Why a run ended without touching the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoActionReason {
    /// Transcript holds no feature request or bug report.
    Neither,
    /// The script-processing exchange produced no usable result.
    ClassificationFailed,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// A new issue was filed. `fallback` is set when duplicate comparison failed.
    Created { issue_id: String, fallback: bool },
    /// A comment was appended to an existing issue.
    Commented { issue_id: String },
    NoAction(NoActionReason),
    /// The single write was attempted and the backend refused it.
    WriteFailed { operation: &'static str },
}

impl PipelineOutcome {
    /// Created or updated ticket, if any.
    pub fn ticket(&self) -> Option<&str> {
        match self {
            Self::Created { issue_id, .. } | Self::Commented { issue_id } => Some(issue_id),
            Self::NoAction(_) | Self::WriteFailed { .. } => None,
        }
    }

    /// Human-readable line for stdout.
    pub fn status_line(&self) -> String {
        match self {
            Self::Created { issue_id, .. } => format!("Linear ticket created with ID: {issue_id}"),
            Self::Commented { issue_id } => format!("Ticket {issue_id} updated with comment"),
            Self::NoAction(NoActionReason::Neither) => {
                "Transcript did not include bug or feature request.".to_string()
            }
            Self::NoAction(NoActionReason::ClassificationFailed) => {
                "Transcript could not be classified; no ticket action taken.".to_string()
            }
            Self::WriteFailed { operation } => format!("Ticket {operation} failed; see log."),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Created { fallback: false, .. } => "created",
            Self::Created { fallback: true, .. } => "created_fallback",
            Self::Commented { .. } => "commented",
            Self::NoAction(NoActionReason::Neither) => "no_action",
            Self::NoAction(NoActionReason::ClassificationFailed) => "classification_failed",
            Self::WriteFailed { .. } => "write_failed",
        }
    }
}

/// Sequences classifier, resolver, and the single tracker write.
pub struct Orchestrator {
    classifier: TranscriptClassifier,
    resolver: DuplicateResolver,
    tracker: Arc<dyn IssueTracker>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn ClassificationEngine>,
        tracker: Arc<dyn IssueTracker>,
        field: ComparisonField,
    ) -> Self {
        Self {
            classifier: TranscriptClassifier::new(engine.clone()),
            resolver: DuplicateResolver::new(engine, tracker.clone(), field),
            tracker,
        }
    }

    /// Run one transcript through the pipeline.
    pub async fn process(&self, transcript: &str) -> PipelineOutcome {
        let mut metrics = RunMetrics::new();
        let outcome = self.run(transcript, &mut metrics).await;
        debug_assert!(metrics.writes() <= 1, "pipeline wrote more than once");
        metrics.finish(outcome.label());
        outcome
    }

    async fn run(&self, transcript: &str, metrics: &mut RunMetrics) -> PipelineOutcome {
        let started = Instant::now();
        let classification = self.classifier.classify(transcript).await;
        metrics.record_stage(Stage::Classify, started.elapsed());

        let draft = match classification {
            Ok(Classification::Actionable(draft)) => draft,
            Ok(Classification::Neither) => {
                tracing::info!("transcript did not include a bug or feature request");
                return PipelineOutcome::NoAction(NoActionReason::Neither);
            }
            Err(e) => {
                tracing::error!(error = %e, class = %e.class(), "script classification failed");
                return PipelineOutcome::NoAction(NoActionReason::ClassificationFailed);
            }
        };
        tracing::info!(kind = %draft.request_type, name = %draft.name, "transcript classified");

        let started = Instant::now();
        let decision = self.resolver.resolve(&draft).await;
        metrics.record_stage(Stage::Resolve, started.elapsed());

        let started = Instant::now();
        let outcome = match decision {
            None => {
                tracing::error!(
                    "unable to compare to existing issues; defaulting to a new issue"
                );
                self.file_new_issue(&draft, true, metrics).await
            }
            Some(MatchDecision::NewIssue) => {
                tracing::info!("new issue is not related to any existing issue");
                self.file_new_issue(&draft, false, metrics).await
            }
            Some(MatchDecision::Existing { issue_id, comment }) => {
                tracing::info!(issue_id = %issue_id, "new issue extends an existing issue");
                self.comment_on(issue_id, &comment, metrics).await
            }
        };
        metrics.record_stage(Stage::Write, started.elapsed());
        outcome
    }

    async fn file_new_issue(
        &self,
        draft: &NewIssueDraft,
        fallback: bool,
        metrics: &mut RunMetrics,
    ) -> PipelineOutcome {
        let label_name = draft.request_type.label_name();
        let label_id = match self.tracker.resolve_label_id(label_name).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(label = label_name, error = %e, "label not resolved; filing unlabeled");
                None
            }
        };

        metrics.record_write();
        match self
            .tracker
            .create_issue(&draft.name, &draft.description, label_id.as_deref())
            .await
        {
            Ok(issue_id) => {
                tracing::info!(issue_id = %issue_id, fallback, "ticket created");
                PipelineOutcome::Created { issue_id, fallback }
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to create ticket");
                PipelineOutcome::WriteFailed {
                    operation: "create",
                }
            }
        }
    }

    async fn comment_on(
        &self,
        issue_id: String,
        comment: &str,
        metrics: &mut RunMetrics,
    ) -> PipelineOutcome {
        metrics.record_write();
        match self.tracker.add_comment(&issue_id, comment).await {
            Ok(()) => {
                tracing::info!(issue_id = %issue_id, "ticket updated with comment");
                PipelineOutcome::Commented { issue_id }
            }
            Err(e) => {
                tracing::error!(issue_id = %issue_id, error = %e, "unable to update ticket with comment");
                PipelineOutcome::WriteFailed {
                    operation: "comment",
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_reference_only_for_writes() {
        let created = PipelineOutcome::Created {
            issue_id: "issue-1".into(),
            fallback: true,
        };
        assert_eq!(created.ticket(), Some("issue-1"));
        assert_eq!(
            PipelineOutcome::Commented {
                issue_id: "ISS-42".into()
            }
            .ticket(),
            Some("ISS-42")
        );
        assert_eq!(
            PipelineOutcome::NoAction(NoActionReason::Neither).ticket(),
            None
        );
        assert_eq!(
            PipelineOutcome::WriteFailed {
                operation: "comment"
            }
            .ticket(),
            None
        );
    }

    #[test]
    fn status_lines() {
        assert_eq!(
            PipelineOutcome::Created {
                issue_id: "abc".into(),
                fallback: false
            }
            .status_line(),
            "Linear ticket created with ID: abc"
        );
        assert_eq!(
            PipelineOutcome::NoAction(NoActionReason::Neither).status_line(),
            "Transcript did not include bug or feature request."
        );
        assert_eq!(
            PipelineOutcome::Commented {
                issue_id: "ISS-42".into()
            }
            .status_line(),
            "Ticket ISS-42 updated with comment"
        );
    }

    #[test]
    fn labels_distinguish_fallback() {
        let fallback = PipelineOutcome::Created {
            issue_id: "x".into(),
            fallback: true,
        };
        assert_eq!(fallback.label(), "created_fallback");
        assert_eq!(
            PipelineOutcome::NoAction(NoActionReason::ClassificationFailed).label(),
            "classification_failed"
        );
    }
}
