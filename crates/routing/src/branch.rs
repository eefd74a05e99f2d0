//! Deterministic branch names for submitted tasks.

use std::sync::LazyLock;

use regex::Regex;

use crate::{BranchName, IssueIdentifier};

/// Maximum length of the title slug, in characters.
pub const SLUG_MAX_CHARS: usize = 30;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("static regex"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").expect("static regex"));

/// Reduces a title to lowercase word characters joined by single hyphens,
/// at most [`SLUG_MAX_CHARS`] long, with no leading or trailing hyphen.
///
/// Applying it to its own output returns the same string.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lowered, "");
    let hyphenated = SEPARATORS.replace_all(&stripped, "-");
    let truncated: String = hyphenated
        .trim_matches('-')
        .chars()
        .take(SLUG_MAX_CHARS)
        .collect();
    // Truncation can land on a separator.
    truncated.trim_end_matches('-').to_string()
}

/// Returns `linear/<identifier>-<slug>` for an issue.
pub fn branch_name(identifier: &IssueIdentifier, title: &str) -> BranchName {
    BranchName::linked_to(identifier, &slugify(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> IssueIdentifier {
        IssueIdentifier::new(raw).expect("identifier")
    }

    #[test]
    fn punctuation_is_stripped_and_words_hyphenated() {
        assert_eq!(slugify("Fix: login bug!!"), "fix-login-bug");
        assert_eq!(
            branch_name(&id("TEAM-123"), "Fix: login bug!!").as_str(),
            "linear/team-123-fix-login-bug"
        );
    }

    #[test]
    fn runs_of_spaces_and_hyphens_collapse() {
        assert_eq!(slugify("  a -- b\t\tc  "), "a-b-c");
        assert_eq!(slugify("---leading and trailing---"), "leading-and-trailing");
    }

    #[test]
    fn slug_is_truncated_to_thirty_characters() {
        let slug = slugify("Implement the brand new onboarding flow for enterprise customers");
        assert!(slug.chars().count() <= SLUG_MAX_CHARS);
        assert!(slug.starts_with("implement-the-brand-new"));
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn truncation_on_a_separator_drops_the_hyphen() {
        // 29 characters, then a separator at position 30.
        let title = format!("{} tail", "a".repeat(29));
        assert_eq!(slugify(&title), "a".repeat(29));
    }

    #[test]
    fn slugify_is_idempotent() {
        for title in [
            "Fix: login bug!!",
            "Ünïcödé títle — with dashes",
            "snake_case_and_digits 123",
            "Implement the brand new onboarding flow for enterprise customers",
            "",
            "!!!",
        ] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once, "title {title:?}");
        }
    }

    #[test]
    fn same_input_always_yields_same_branch() {
        let a = branch_name(&id("OPS-7"), "Rotate keys");
        let b = branch_name(&id("OPS-7"), "Rotate keys");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "linear/ops-7-rotate-keys");
    }
}
