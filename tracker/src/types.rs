//! Domain types returned by the ticket backend.

use serde::{Deserialize, Deserializer, Serialize};

/// Linear team identifier.
///
/// Resolved once per run by [`crate::LinearClient::connect`] and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An existing issue in the team's tracker. Read-only to this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique within the team scope.
    pub id: String,
    pub title: String,
    /// Linear returns `null` for issues created without a body.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

/// An issue label resolved by exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub id: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_description_becomes_empty() {
        let issue: Issue = serde_json::from_str(
            r#"{"id": "ISS-1", "title": "Export is slow", "description": null}"#,
        )
        .unwrap();
        assert_eq!(issue.description, "");
    }

    #[test]
    fn missing_description_becomes_empty() {
        let issue: Issue =
            serde_json::from_str(r#"{"id": "ISS-2", "title": "Dark mode"}"#).unwrap();
        assert_eq!(issue.id, "ISS-2");
        assert!(issue.description.is_empty());
    }

    #[test]
    fn team_id_displays_raw_value() {
        assert_eq!(TeamId("team-123".into()).to_string(), "team-123");
    }
}
