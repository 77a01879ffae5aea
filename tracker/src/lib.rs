//! Linear ticket backend client.
//!
//! Thin request/response mapping over Linear's GraphQL endpoint. No business
//! logic lives here: callers decide *what* to file, this crate only knows
//! *how* to list, create, and comment.
//!
//! # Operations
//!
//! ```text
//! LinearClient::connect      - resolve the team id once, keep it for the run
//! resolve_label_id(name)     - label id by exact name (cached per client)
//! create_issue(..)           - issueCreate mutation, returns the new id
//! add_comment(id, body)      - commentCreate mutation
//! list_active_issues()       - team issues not in a completed/canceled state
//! ```

pub mod client;
pub mod error;
pub mod queries;
pub mod types;

pub use client::{IssueTracker, LinearClient, TrackerConfig, DEFAULT_LINEAR_ENDPOINT};
pub use error::{TrackerError, TrackerResult};
pub use types::{Issue, Label, TeamId};
