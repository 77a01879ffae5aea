//! Transcript classification: feature request, bug report, or neither.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::{ClassificationEngine, ClassificationResult, SCRIPT_PROCESSING};
use crate::errors::EngineError;

/// What the customer asked for, as returned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Feature,
    Bug,
    Neither,
}

/// Actionable subset of [`RequestType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Feature,
    Bug,
}

impl IssueKind {
    /// Tracker label attached to issues of this kind.
    pub fn label_name(self) -> &'static str {
        match self {
            Self::Feature => "Feature",
            Self::Bug => "Bug",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feature => write!(f, "feature"),
            Self::Bug => write!(f, "bug"),
        }
    }
}

/// Classified-but-unfiled issue candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssueDraft {
    pub request_type: IssueKind,
    pub name: String,
    pub description: String,
}

/// Interpreted result of the script-processing exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Actionable(NewIssueDraft),
    Neither,
}

#[derive(Debug, Deserialize)]
struct ScriptArgs {
    request_type: RequestType,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<&ClassificationResult> for Classification {
    type Error = EngineError;

    fn try_from(result: &ClassificationResult) -> Result<Self, Self::Error> {
        let args: ScriptArgs = result.parse()?;
        let kind = match args.request_type {
            RequestType::Neither => return Ok(Self::Neither),
            RequestType::Feature => IssueKind::Feature,
            RequestType::Bug => IssueKind::Bug,
        };

        let name = non_empty(args.name)
            .ok_or_else(|| EngineError::schema(format!("{kind} draft is missing 'name'")))?;
        let description = non_empty(args.description).ok_or_else(|| {
            EngineError::schema(format!("{kind} draft is missing 'description'"))
        })?;

        Ok(Self::Actionable(NewIssueDraft {
            request_type: kind,
            name,
            description,
        }))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Runs the script-processing exchange over a transcript.
pub struct TranscriptClassifier {
    engine: Arc<dyn ClassificationEngine>,
}

impl TranscriptClassifier {
    pub fn new(engine: Arc<dyn ClassificationEngine>) -> Self {
        Self { engine }
    }

    /// Classify `transcript`, keeping the reason when nothing usable came back.
    ///
    /// A blank transcript is `Neither` without an exchange.
    pub async fn classify(&self, transcript: &str) -> Result<Classification, EngineError> {
        if transcript.trim().is_empty() {
            return Ok(Classification::Neither);
        }

        let result = self.engine.classify(transcript, &SCRIPT_PROCESSING).await?;
        Classification::try_from(&result)
    }

    /// Draft to file, or `None` when no ticket action should follow.
    pub async fn classify_transcript(&self, transcript: &str) -> Option<NewIssueDraft> {
        match self.classify(transcript).await {
            Ok(Classification::Actionable(draft)) => Some(draft),
            Ok(Classification::Neither) => {
                tracing::info!("transcript did not include a bug or feature request");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, class = %e.class(), "script classification failed");
                None
            }
        }
    }
}
