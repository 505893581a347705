//! Security module: identifier whitelist and the read-only query guard.

mod identifiers;
mod validation;

pub use identifiers::{
    is_identifier, quote_identifier, safe_identifier, validate_identifier, MAX_IDENTIFIER_LENGTH,
};
pub use validation::{wrap_with_limit, SelectGuard, BLOCKED_KEYWORDS};
