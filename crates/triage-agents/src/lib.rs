//! Support transcript triage.
//!
//! Classifies a customer-support transcript as a feature request, bug report,
//! or neither, then either files a new Linear issue or comments on the
//! matching active one.
//!
//! | Module         | Purpose                                              |
//! |----------------|------------------------------------------------------|
//! | `engine`       | Classification exchange seam + Assistants backend    |
//! | `classifier`   | Transcript → `NewIssueDraft`                         |
//! | `resolver`     | Draft vs. active issues → `MatchDecision`            |
//! | `orchestrator` | Classify → resolve → exactly one tracker write       |
//! | `config`       | Env / TOML configuration                             |

pub mod classifier;
pub mod config;
pub mod engine;
pub mod errors;
pub mod orchestrator;
pub mod prompts;
pub mod resolver;
pub mod telemetry;
pub mod transcript;

pub use classifier::{Classification, IssueKind, NewIssueDraft, RequestType, TranscriptClassifier};
pub use config::{ConfigError, Settings, TriageConfig};
pub use engine::{AssistantsEngine, ClassificationEngine, EngineConfig};
pub use errors::EngineError;
pub use orchestrator::{NoActionReason, Orchestrator, PipelineOutcome};
pub use resolver::{DuplicateResolver, MatchDecision};
