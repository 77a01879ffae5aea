//! Transcript input for the CLI.

use std::io::{self, Read};
use std::path::Path;

/// Support call used when no transcript is supplied.
pub const SAMPLE_TRANSCRIPT: &str = "\
[Customer Service Agent (CSA)]: Good morning, thank you for calling XYZ SaaS Support. This is Sarah, how may I assist you today?

[Customer (C)]: Hi Sarah, this is John from ABC Corporation. I've been using your platform for a while now, and I have a feature request that I believe would greatly benefit our workflow.

[CSA]: Of course, John. We're always looking to improve our platform based on our users' needs. What feature would you like to see implemented?

[C]: Well, currently, we're finding it challenging to track the progress of multiple projects simultaneously. It would be incredibly helpful if we could have a dashboard that provides a comprehensive overview of all ongoing projects with their respective statuses and timelines.

[CSA]: I see, having a centralized dashboard for project management sounds like a valuable addition. Could you please elaborate on the specific functionalities or metrics you'd like to see displayed on this dashboard?

[C]: Certainly. We'd need to see the project name, assigned team members, current status (such as in progress, completed, on hold), upcoming deadlines, and any critical milestones. Additionally, it would be beneficial to have a filter option to view projects based on different criteria like priority or department.

[CSA]: That sounds like a robust solution for your project management needs. I'll make sure to pass on your feedback to our development team for consideration. Is there anything else you'd like to add or any other pain points you've encountered?

[C]: No, that covers it for now. I appreciate your attention to our suggestion, Sarah.

[CSA]: You're very welcome, John. We truly value your feedback, as it helps us tailor our product to better suit your needs. If you have any further questions or concerns in the future, don't hesitate to reach out. Have a great day!

[C]: Thank you, Sarah. You too, goodbye.
";

/// Read a transcript from `path` (`-` is stdin), or fall back to the sample.
pub fn load(path: Option<&Path>) -> io::Result<String> {
    match path {
        None => Ok(SAMPLE_TRANSCRIPT.to_string()),
        Some(p) if p.as_os_str() == "-" => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(p) => std::fs::read_to_string(p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_uses_sample() {
        let transcript = load(None).unwrap();
        assert!(transcript.contains("dashboard"));
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.txt");
        std::fs::write(&path, "[C]: the export button is broken").unwrap();
        assert_eq!(load(Some(&path)).unwrap(), "[C]: the export button is broken");
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("nope.txt"))).is_err());
    }
}
