//! Read-only guard for ad-hoc statements.
//!
//! The guard is a keyword blacklist. It keeps honest users from running
//! writes through the query box; it is not a parser, and the privileges of
//! the configured database account remain the real boundary.

use crate::error::ServerError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Keywords rejected anywhere in an ad-hoc statement, as whole words.
pub const BLOCKED_KEYWORDS: [&str; 9] = [
    "insert", "update", "delete", "drop", "alter", "create", "truncate", "grant", "revoke",
];

static BLOCKED_KEYWORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"(?i)\b({})\b", BLOCKED_KEYWORDS.join("|"));
    Regex::new(&pattern)
        .unwrap_or_else(|e| panic!("Internal error: invalid keyword pattern '{}': {}", pattern, e))
});

/// Guard that only lets single SELECT statements through.
#[derive(Debug, Clone)]
pub struct SelectGuard {
    max_length: usize,
}

impl SelectGuard {
    /// Create a new guard.
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Check a statement, returning it trimmed when it is allowed.
    pub fn check<'a>(&self, sql: Option<&'a str>) -> Result<&'a str, ServerError> {
        let trimmed = sql.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return Err(ServerError::invalid_input("A query is required"));
        }

        let lower = trimmed.to_lowercase();
        if !lower.starts_with("select") {
            return Err(ServerError::validation("Only SELECT statements are allowed"));
        }

        if lower.contains(';') {
            return Err(ServerError::validation(
                "Multiple statements are not allowed; remove the ';'",
            ));
        }

        if let Some(found) = BLOCKED_KEYWORD_PATTERN.find(&lower) {
            return Err(ServerError::validation(format!(
                "Keyword '{}' is not allowed in a read-only query",
                found.as_str()
            )));
        }

        if trimmed.len() > self.max_length {
            return Err(ServerError::validation(format!(
                "Query exceeds maximum length of {} bytes",
                self.max_length
            )));
        }

        Ok(trimmed)
    }

    /// Get the configured maximum statement length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

/// Wrap a checked SELECT so the database itself caps the result size.
pub fn wrap_with_limit(sql: &str, cap: usize) -> String {
    format!("SELECT * FROM ({}) AS t LIMIT {}", sql, cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> SelectGuard {
        SelectGuard::new(1_000_000)
    }

    #[test]
    fn test_plain_selects_pass() {
        let g = guard();
        assert_eq!(g.check(Some("SELECT * FROM users")).unwrap(), "SELECT * FROM users");
        assert_eq!(g.check(Some("  select 1  \n")).unwrap(), "select 1");
        assert!(g.check(Some("SeLeCt name FROM users WHERE id = 3")).is_ok());
        assert!(g
            .check(Some("SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id"))
            .is_ok());
    }

    #[test]
    fn test_blank_is_rejected() {
        let g = guard();
        assert!(matches!(g.check(None), Err(ServerError::InvalidInput(_))));
        assert!(matches!(g.check(Some("")), Err(ServerError::InvalidInput(_))));
        assert!(matches!(g.check(Some("   \t")), Err(ServerError::InvalidInput(_))));
    }

    #[test]
    fn test_non_select_is_rejected() {
        let g = guard();
        assert!(g.check(Some("DELETE FROM users")).is_err());
        assert!(g.check(Some("SHOW TABLES")).is_err());
        assert!(g.check(Some("WITH x AS (SELECT 1) SELECT * FROM x")).is_err());
        assert!(g.check(Some("-- hi\nSELECT 1")).is_err());
    }

    #[test]
    fn test_semicolon_is_rejected() {
        let g = guard();
        assert!(g.check(Some("SELECT 1;")).is_err());
        assert!(g.check(Some("SELECT 1; SELECT 2")).is_err());
        assert!(g.check(Some("SELECT ';' AS s")).is_err());
    }

    #[test]
    fn test_blocked_keywords_are_rejected() {
        let g = guard();
        for keyword in BLOCKED_KEYWORDS {
            let sql = format!("SELECT * FROM users WHERE x = (SELECT 1) OR {} 1", keyword.to_uppercase());
            assert!(g.check(Some(&sql)).is_err(), "{keyword} should be blocked");
        }
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        let g = guard();
        assert!(g.check(Some("SELECT created_at, updated_by FROM audit")).is_ok());
        assert!(g.check(Some("SELECT * FROM deleted_users")).is_ok());
        assert!(g.check(Some("SELECT update_count FROM stats")).is_ok());
    }

    #[test]
    fn test_length_limit() {
        let g = SelectGuard::new(20);
        assert!(g.check(Some("SELECT 1")).is_ok());
        let long = format!("SELECT {}", "x".repeat(20));
        assert!(matches!(g.check(Some(&long)), Err(ServerError::ValidationFailed(_))));
    }

    #[test]
    fn test_statement_kind_is_reported_before_length() {
        let g = SelectGuard::new(20);

        let long_delete = format!("DELETE FROM {}", "x".repeat(40));
        let err = g.check(Some(&long_delete)).unwrap_err();
        assert!(err.to_string().contains("Only SELECT statements are allowed"));

        let long_drop = format!("SELECT 1 FROM t WHERE drop_{} = 1; DROP TABLE t", "x".repeat(40));
        let err = g.check(Some(&long_drop)).unwrap_err();
        assert!(err.to_string().contains("';'"));
    }

    #[test]
    fn test_wrap_with_limit() {
        assert_eq!(
            wrap_with_limit("SELECT id FROM users", 200),
            "SELECT * FROM (SELECT id FROM users) AS t LIMIT 200"
        );
    }
}
