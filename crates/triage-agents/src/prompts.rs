//! Assistant instructions and prompt assembly.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever instruction text or the
//! comparison prompt layout changes, so log lines can be tied to the prompt
//! that produced a decision.

use serde::{Deserialize, Serialize};
use tracker::Issue;

use crate::classifier::NewIssueDraft;

/// Prompt version. Bump on any instruction or layout change.
pub const PROMPT_VERSION: &str = "1.1.0";

/// Instructions for the transcript classification assistant.
pub const SCRIPT_PROCESSOR_INSTRUCTIONS: &str = "\
You are an assistant that processes a conversation transcript between a customer and a \
service representative. Based on the transcript, determine if the customer is asking for a \
feature request, reporting a bug, or neither. Using this, call a function to create a Linear \
ticket if it is a feature or bug.";

/// Instructions for the duplicate matching assistant.
pub const ISSUE_MATCHING_INSTRUCTIONS: &str = "\
You are an assistant that takes in a new issue ticket and existing issue tickets. Based on \
the previous issues' descriptions and the new issue's description, determine if the new issue \
is completely new, or if it is similar to a previous issue and return that previous issue's ID.";

const EXISTING_HEADER: &str = "The following are the existing issues in Linear.\n\n";
const NEW_HEADER: &str = "This is the new issue: \n\n";

/// Which issue field fills the `Issue description:` line of the comparison
/// prompt.
///
/// `Title` reproduces the legacy prompt, which repeated the title there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonField {
    #[default]
    Description,
    Title,
}

impl std::str::FromStr for ComparisonField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "description" => Ok(Self::Description),
            "title" => Ok(Self::Title),
            other => Err(format!("unknown comparison field '{other}'")),
        }
    }
}

/// Build the duplicate-matching prompt: every active issue, then the draft.
pub fn comparison_prompt(issues: &[Issue], draft: &NewIssueDraft, field: ComparisonField) -> String {
    let mut prompt = String::from(EXISTING_HEADER);
    for issue in issues {
        let description = match field {
            ComparisonField::Description => issue.description.as_str(),
            ComparisonField::Title => issue.title.as_str(),
        };
        prompt.push_str(&format!(
            "Issue id: {}\nIssue title: {}\nIssue description: {}\n\n",
            issue.id, issue.title, description
        ));
    }

    prompt.push_str(NEW_HEADER);
    prompt.push_str(&format!(
        "Issue title: {}\nIssue description: {}\n\n",
        draft.name, draft.description
    ));
    prompt
}
