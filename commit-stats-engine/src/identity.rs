//! Author identity matching between developer handles and commit authors.
//!
//! A developer handle may be a platform login, a full email address, or an
//! email local-part. Matching is case-insensitive. When two distinct handles
//! share an email local-part, both are credited; the resolver makes no
//! attempt at global uniqueness.

use crate::model::AuthorCandidates;

/// Returns true when the commit author metadata denotes the developer.
///
/// Accepted, case-insensitively:
///   * handle == author login
///   * handle == author email (bare, after stripping `Name <addr>` wrapping)
///   * handle == local part of the author email (before `@`)
pub fn matches(handle: &str, author: &AuthorCandidates) -> bool {
    let handle = handle.trim();
    if handle.is_empty() {
        return false;
    }

    if let Some(login) = author.login.as_deref() {
        if login.eq_ignore_ascii_case(handle) {
            return true;
        }
    }

    if let Some(raw) = author.email.as_deref() {
        let email = extract_address(raw);
        if email.eq_ignore_ascii_case(handle) {
            return true;
        }
        if let Some((local, _)) = email.split_once('@') {
            if local.eq_ignore_ascii_case(handle) {
                return true;
            }
        }
    }

    false
}

/// Strips an RFC-style `Display Name <user@host>` wrapper down to the bare
/// address. Inputs without angle brackets are returned trimmed.
pub fn extract_address(raw: &str) -> &str {
    match (raw.rfind('<'), raw.rfind('>')) {
        (Some(open), Some(close)) if open < close => raw[open + 1..close].trim(),
        _ => raw.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(login: Option<&str>, email: Option<&str>) -> AuthorCandidates {
        AuthorCandidates {
            login: login.map(str::to_string),
            email: email.map(str::to_string),
            name: None,
        }
    }

    #[test]
    fn matches_login_case_insensitively() {
        assert!(matches("JDoe", &author(Some("jdoe"), None)));
        assert!(!matches("jdoe", &author(Some("someone"), None)));
    }

    #[test]
    fn matches_full_email() {
        assert!(matches("jdoe@example.com", &author(None, Some("JDoe@Example.com"))));
    }

    #[test]
    fn matches_email_local_part() {
        assert!(matches("jdoe", &author(None, Some("jdoe@example.com"))));
        assert!(!matches("jdoe", &author(None, Some("other@example.com"))));
    }

    #[test]
    fn strips_angle_bracket_wrapping() {
        assert_eq!(extract_address("John Doe <jdoe@example.com>"), "jdoe@example.com");
        assert_eq!(extract_address("jdoe@example.com"), "jdoe@example.com");
        assert_eq!(extract_address("  <a@b.c> "), "a@b.c");

        assert!(matches("jdoe", &author(None, Some("John Doe <jdoe@example.com>"))));
    }

    #[test]
    fn no_candidates_never_match() {
        assert!(!matches("jdoe", &author(None, None)));
        assert!(!matches("", &author(Some(""), Some(""))));
    }

    #[test]
    fn shared_local_part_credits_both_handles() {
        // Two different handles resolving through the same local part is
        // accepted by policy; see module docs.
        let a = author(None, Some("dev@corp.example"));
        assert!(matches("dev", &a));
        assert!(matches("DEV", &a));
    }
}
