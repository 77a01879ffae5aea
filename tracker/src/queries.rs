//! GraphQL documents sent to Linear.
//!
//! User-supplied text always travels in `variables`, never spliced into the
//! document, so quotes and newlines in transcripts survive intact.

/// Operation name: list teams visible to the API key.
pub const TEAMS_OP: &str = "Teams";
pub const TEAMS: &str = r#"
query Teams {
    teams {
        nodes {
            id
            name
        }
    }
}
"#;

/// Operation name: label lookup by exact name.
pub const ISSUE_LABELS_OP: &str = "IssueLabels";
pub const ISSUE_LABELS: &str = r#"
query IssueLabels($name: String!) {
    issueLabels(filter: { name: { eq: $name } }) {
        nodes {
            id
            name
        }
    }
}
"#;

/// Operation name: create an issue.
pub const ISSUE_CREATE_OP: &str = "IssueCreate";
pub const ISSUE_CREATE: &str = r#"
mutation IssueCreate($input: IssueCreateInput!) {
    issueCreate(input: $input) {
        success
        issue {
            id
            title
        }
    }
}
"#;

/// Operation name: comment on an issue.
pub const COMMENT_CREATE_OP: &str = "CommentCreate";
pub const COMMENT_CREATE: &str = r#"
mutation CommentCreate($input: CommentCreateInput!) {
    commentCreate(input: $input) {
        success
    }
}
"#;

/// Operation name: one page of the team's open issues.
pub const ACTIVE_ISSUES_OP: &str = "ActiveIssues";
pub const ACTIVE_ISSUES: &str = r#"
query ActiveIssues($teamId: ID!, $first: Int!, $after: String) {
    issues(
        first: $first
        after: $after
        filter: {
            team: { id: { eq: $teamId } }
            state: { type: { nin: ["completed", "canceled"] } }
        }
    ) {
        nodes {
            id
            title
            description
        }
        pageInfo {
            hasNextPage
            endCursor
        }
    }
}
"#;

/// Largest page Linear serves for a connection query.
pub const MAX_PAGE_SIZE: usize = 100;
