//! Classification engine seam.
//!
//! A classification exchange submits one prompt and gets back structured
//! fields conforming to a [`ClassificationSchema`], or an [`EngineError`]
//! saying why nothing usable came back. "No result" is an ordinary outcome;
//! callers turn it into `None` and carry on.

pub mod assistants;
pub mod schema;

use async_trait::async_trait;

use crate::errors::EngineError;

pub use assistants::{AssistantsEngine, EngineConfig, RunStatus};
pub use schema::{
    ClassificationResult, ClassificationSchema, FieldKind, SchemaField, ISSUE_MATCHING,
    SCRIPT_PROCESSING,
};

/// One request/response exchange with a structured-output classifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassificationEngine: Send + Sync {
    /// Submit `prompt` and wait for arguments matching `schema`.
    ///
    /// Implementations own every engine-side resource they create for the
    /// exchange and release it before returning, on success and failure alike.
    async fn classify(
        &self,
        prompt: &str,
        schema: &ClassificationSchema,
    ) -> Result<ClassificationResult, EngineError>;
}
