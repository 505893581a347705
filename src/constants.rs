//! Centralized constants for the table browser.
//!
//! Defaults and limits used across configuration, statement building and
//! the HTTP layer live here so they are easy to find and change.

use std::time::Duration;

// =============================================================================
// Timeout Constants
// =============================================================================

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Default per-statement timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default connection timeout as Duration.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS);

/// Default per-statement timeout as Duration.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS);

// =============================================================================
// Connection Pool Constants
// =============================================================================

/// Default MySQL port.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Default minimum connections in pool.
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Default maximum connections in pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default connection idle timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// Paging and Result Size Constants
// =============================================================================

/// Default page size for row browsing.
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Minimum page size for row browsing.
pub const MIN_PAGE_SIZE: i64 = 1;

/// Maximum page size for row browsing.
pub const MAX_PAGE_SIZE: i64 = 500;

/// Row cap applied to ad-hoc SELECT statements.
pub const DEFAULT_QUERY_ROW_CAP: usize = 200;

/// Maximum ad-hoc query length in bytes.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 100_000;

// =============================================================================
// HTTP Constants
// =============================================================================

/// Default HTTP bind host.
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";

/// Default HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default maximum request body size (2MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// Shutdown Constants
// =============================================================================

/// Default shutdown drain timeout in seconds.
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

/// Default shutdown drain timeout as Duration.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(DEFAULT_DRAIN_TIMEOUT_SECS);

// =============================================================================
// Logging Constants
// =============================================================================

/// Default truncation length for statement logging.
pub const LOG_QUERY_TRUNCATE_LENGTH: usize = 200;
