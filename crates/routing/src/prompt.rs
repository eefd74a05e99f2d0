//! Deterministic task prompts.

use crate::{BranchName, IssueSummary};

const CLOSING_LINE: &str = "\nPlease analyze this task and implement the necessary changes.";

/// Builds the task prompt for an issue.
///
/// Paragraphs, separated by a blank line, in fixed order: identifier, title,
/// description (when non-empty), issue URL (when non-empty), closing request.
pub fn build_task_prompt(issue: &IssueSummary) -> String {
    let mut parts = vec![
        format!("Task from Linear: {}", issue.identifier),
        format!("Title: {}", issue.title),
    ];
    if let Some(description) = issue.description.as_deref().filter(|d| !d.is_empty()) {
        parts.push(format!("Description:\n{description}"));
    }
    if let Some(url) = issue.url.as_deref().filter(|u| !u.is_empty()) {
        parts.push(format!("Linear URL: {url}"));
    }
    parts.push(CLOSING_LINE.to_string());
    parts.join("\n\n")
}

/// Appends the branch and pull request instructions sent to the agent.
pub fn with_branch_instructions(task_prompt: &str, branch: &BranchName, base_branch: &str) -> String {
    format!(
        "{task_prompt}\n\nCreate a new branch named '{branch}' for this work.\
         \n\nWhen complete, create a pull request targeting the '{base_branch}' branch."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IssueId, IssueIdentifier};

    fn summary(description: Option<&str>, url: Option<&str>) -> IssueSummary {
        IssueSummary {
            id: IssueId::new("issue-123").expect("id"),
            identifier: IssueIdentifier::new("TEAM-123").expect("identifier"),
            title: "Fix login bug".into(),
            description: description.map(str::to_string),
            assignee: Some("john@example.com".into()),
            url: url.map(str::to_string),
            priority: None,
        }
    }

    #[test]
    fn full_prompt_has_every_section_in_order() {
        let prompt = build_task_prompt(&summary(
            Some("Users cannot log in."),
            Some("https://linear.app/t/TEAM-123"),
        ));
        assert_eq!(
            prompt,
            "Task from Linear: TEAM-123\n\n\
             Title: Fix login bug\n\n\
             Description:\nUsers cannot log in.\n\n\
             Linear URL: https://linear.app/t/TEAM-123\n\n\
             \nPlease analyze this task and implement the necessary changes."
        );
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let prompt = build_task_prompt(&summary(Some(""), None));
        assert!(!prompt.contains("Description:"));
        assert!(!prompt.contains("Linear URL:"));
        assert!(prompt.starts_with("Task from Linear: TEAM-123\n\nTitle: Fix login bug"));
    }

    #[test]
    fn instructions_name_branch_and_base() {
        let branch = BranchName::new("linear/team-123-fix-login-bug").expect("branch");
        let sent = with_branch_instructions("TASK", &branch, "develop");
        assert_eq!(
            sent,
            "TASK\n\nCreate a new branch named 'linear/team-123-fix-login-bug' for this work.\n\n\
             When complete, create a pull request targeting the 'develop' branch."
        );
    }
}
