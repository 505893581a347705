//! Identifier whitelist and MySQL identifier quoting.
//!
//! Table and column names cannot be bound as statement parameters, so they
//! are interpolated into SQL text. Only names made of ASCII letters, digits
//! and underscores are ever interpolated, and always inside backticks.

use crate::error::ServerError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length for MySQL identifiers.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// The identifier whitelist.
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+$")
        .unwrap_or_else(|e| panic!("Internal error: invalid identifier pattern: {}", e))
});

/// Check whether a name passes the identifier whitelist.
///
/// ```
/// use mysql_table_browser::security::is_identifier;
///
/// assert!(is_identifier("order_items"));
/// assert!(!is_identifier("orders; DROP TABLE users"));
/// assert!(!is_identifier(""));
/// ```
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Validate that an identifier may be interpolated into SQL text.
pub fn validate_identifier(name: &str) -> Result<(), ServerError> {
    if name.trim().is_empty() {
        return Err(ServerError::invalid_input("Identifier cannot be empty"));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ServerError::invalid_input(format!(
            "Identifier exceeds maximum length of {} characters",
            MAX_IDENTIFIER_LENGTH
        )));
    }

    if !is_identifier(name) {
        return Err(ServerError::invalid_input(format!(
            "Invalid identifier '{}': only letters, digits and underscores are allowed",
            name
        )));
    }

    Ok(())
}

/// Quote an identifier with backticks.
///
/// Callers pass names that already passed [`is_identifier`]; embedded
/// backticks are still doubled so the output is well-formed regardless.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Validate and quote an identifier in one step.
pub fn safe_identifier(name: &str) -> Result<String, ServerError> {
    validate_identifier(name)?;
    Ok(quote_identifier(name))
}
