//! Error types for the table browser.
//!
//! This module defines semantic error types with MySQL error code mapping
//! for user-friendly error messages.

use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

/// Domain-specific errors for the table browser.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Database (schema) not found
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    /// Object not found (table, column, ...)
    #[error("{object_type} not found: {name}")]
    ObjectNotFound { object_type: String, name: String },

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Query validation error
    #[error("Query validation failed: {0}")]
    ValidationFailed(String),

    /// Query execution error
    #[error("Query execution error: {message}")]
    QueryExecution {
        message: String,
        sql_error_code: Option<u16>,
        sql_state: Option<String>,
    },

    /// Error raised by an ad-hoc SELECT, reported with the driver's message
    #[error("SQL error: {0}")]
    Sql(String),

    /// Query or request timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Data truncation
    #[error("Data truncation: {0}")]
    DataTruncation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error with a source.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an object not found error.
    pub fn object_not_found(object_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            object_type: object_type.into(),
            name: name.into(),
        }
    }

    /// Create a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::object_not_found("Table", name)
    }

    /// Create a permission denied error.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Create a query execution error.
    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql_error_code: None,
            sql_state: None,
        }
    }

    /// Create a query execution error with MySQL error details.
    pub fn query_error_with_code(msg: impl Into<String>, code: u16, state: Option<String>) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql_error_code: Some(code),
            sql_state: state,
        }
    }

    /// Create an ad-hoc SQL error.
    pub fn sql(msg: impl Into<String>) -> Self {
        Self::Sql(msg.into())
    }

    /// Create a timeout error for a local deadline.
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout(format!("operation exceeded {} seconds", seconds))
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The innermost message, without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Config(msg)
            | Self::Authentication(msg)
            | Self::DatabaseNotFound(msg)
            | Self::PermissionDenied(msg)
            | Self::ValidationFailed(msg)
            | Self::Sql(msg)
            | Self::ConstraintViolation(msg)
            | Self::DataTruncation(msg)
            | Self::Timeout(msg)
            | Self::InvalidInput(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Connection { message, .. } | Self::QueryExecution { message, .. } => {
                message.clone()
            }
            Self::ObjectNotFound { name, .. } => name.clone(),
        }
    }

    /// Check if this error was caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ObjectNotFound { .. }
                | Self::ValidationFailed(_)
                | Self::QueryExecution { .. }
                | Self::Sql(_)
                | Self::ConstraintViolation(_)
                | Self::DataTruncation(_)
                | Self::InvalidInput(_)
        )
    }

    /// Get a user-friendly suggestion for how to fix this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check your environment variables and configuration"),
            Self::Connection { .. } => {
                Some("Check server hostname, port, and network connectivity")
            }
            Self::Authentication(_) => Some("Verify your username and password are correct"),
            Self::DatabaseNotFound(_) => Some("Check MYSQL_DATABASE and ensure the schema exists"),
            Self::ObjectNotFound { .. } => Some("List the available tables and check the name"),
            Self::PermissionDenied(_) => {
                Some("Request appropriate privileges from your database administrator")
            }
            Self::ValidationFailed(_) => {
                Some("Only a single SELECT statement without ';' is accepted")
            }
            Self::Timeout(_) => Some("Try a simpler query or increase MYSQL_QUERY_TIMEOUT"),
            Self::ConstraintViolation(_) => {
                Some("Check the constraint definition and your data values")
            }
            _ => None,
        }
    }
}

/// Map MySQL server error numbers to semantic ServerError types.
pub fn from_sql_error(code: u16, message: &str) -> ServerError {
    match code {
        // Authentication errors
        1045 => ServerError::auth(message),

        // Database errors
        1049 => ServerError::DatabaseNotFound(message.to_string()),

        // Object not found errors
        1146 => ServerError::object_not_found("Table", message),

        // Permission errors
        1044 | 1142 | 1143 => ServerError::permission_denied(message),

        // Timeout (max_execution_time exceeded)
        3024 => ServerError::Timeout(message.to_string()),

        // Connection errors
        1040 => ServerError::connection("Too many connections"),
        1053 => ServerError::connection("Server shutdown in progress"),

        // Constraint violations
        1062 => ServerError::ConstraintViolation(format!("Duplicate key: {}", message)),
        1451 | 1452 => ServerError::ConstraintViolation(format!("Foreign key: {}", message)),
        1048 | 1364 => ServerError::ConstraintViolation(message.to_string()),

        // Data errors
        1406 => ServerError::DataTruncation(message.to_string()),
        1264 => ServerError::query_error_with_code(
            format!("Out of range value: {}", message),
            code,
            None,
        ),
        1366 | 1292 => ServerError::query_error_with_code(
            format!("Incorrect value: {}", message),
            code,
            None,
        ),

        // Syntax errors
        1064 => ServerError::query_error_with_code(format!("Syntax error: {}", message), code, None),

        // Invalid column
        1054 => ServerError::query_error_with_code(format!("Invalid column: {}", message), code, None),

        // Deadlock / lock wait
        1213 => ServerError::query_error_with_code(
            "Transaction was deadlocked and has been rolled back",
            code,
            None,
        ),
        1205 => ServerError::query_error_with_code(
            format!("Lock wait timeout exceeded: {}", message),
            code,
            None,
        ),

        // Default: generic query error
        _ => ServerError::query_error_with_code(message, code, None),
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(e: sqlx::Error) -> Self {
        use sqlx::Error;

        match &e {
            Error::Database(db) => match db.try_downcast_ref::<MySqlDatabaseError>() {
                Some(mysql) => {
                    let mapped = from_sql_error(mysql.number(), mysql.message());
                    match mapped {
                        ServerError::QueryExecution {
                            message,
                            sql_error_code,
                            ..
                        } => ServerError::QueryExecution {
                            message,
                            sql_error_code,
                            sql_state: mysql.code().map(str::to_string),
                        },
                        other => other,
                    }
                }
                None => ServerError::query_error(db.message()),
            },
            Error::Io(_) => ServerError::connection(format!("IO error: {}", e)),
            Error::Tls(_) => ServerError::connection(format!("TLS error: {}", e)),
            Error::Protocol(_) => ServerError::connection(format!("Protocol error: {}", e)),
            Error::PoolTimedOut => ServerError::connection("Timed out acquiring a pooled connection"),
            Error::PoolClosed => ServerError::connection("Connection pool closed"),
            Error::Configuration(_) => ServerError::config(e.to_string()),
            Error::RowNotFound => ServerError::query_error("No rows returned"),
            Error::ColumnDecode { .. } | Error::Decode(_) | Error::TypeNotFound { .. } => {
                ServerError::query_error(format!("Type conversion error: {}", e))
            }
            Error::ColumnNotFound(_) | Error::ColumnIndexOutOfBounds { .. } => {
                ServerError::query_error(e.to_string())
            }
            _ => ServerError::internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_error_mapping() {
        let err = from_sql_error(1045, "Access denied for user 'test'@'localhost'");
        assert!(matches!(err, ServerError::Authentication(_)));

        let err = from_sql_error(1146, "Table 'shop.foo' doesn't exist");
        assert!(matches!(err, ServerError::ObjectNotFound { .. }));

        let err = from_sql_error(1142, "SELECT command denied to user");
        assert!(matches!(err, ServerError::PermissionDenied(_)));

        let err = from_sql_error(1062, "Duplicate entry '1' for key 'PRIMARY'");
        assert!(matches!(err, ServerError::ConstraintViolation(_)));

        let err = from_sql_error(1406, "Data too long for column 'name'");
        assert!(matches!(err, ServerError::DataTruncation(_)));
    }

    #[test]
    fn test_unknown_code_keeps_number() {
        let err = from_sql_error(9999, "something odd");
        match err {
            ServerError::QueryExecution {
                sql_error_code,
                message,
                ..
            } => {
                assert_eq!(sql_error_code, Some(9999));
                assert_eq!(message, "something odd");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_server_timeout_keeps_message() {
        let err = from_sql_error(
            3024,
            "Query execution was interrupted, maximum statement execution time exceeded",
        );
        assert!(matches!(err, ServerError::Timeout(_)));
        assert_eq!(
            err.to_string(),
            "Timeout: Query execution was interrupted, maximum statement execution time exceeded"
        );

        assert_eq!(
            ServerError::timeout(30).to_string(),
            "Timeout: operation exceeded 30 seconds"
        );
    }

    #[test]
    fn test_client_errors() {
        assert!(ServerError::invalid_input("bad").is_client_error());
        assert!(ServerError::table_not_found("t").is_client_error());
        assert!(ServerError::sql("boom").is_client_error());
        assert!(!ServerError::connection("down").is_client_error());
        assert!(!ServerError::internal("bug").is_client_error());
    }

    #[test]
    fn test_detail_strips_prefix() {
        assert_eq!(ServerError::sql("near 'x'").detail(), "near 'x'");
        assert_eq!(ServerError::sql("near 'x'").to_string(), "SQL error: near 'x'");
        assert_eq!(
            from_sql_error(1146, "Table 'shop.foo' doesn't exist").detail(),
            "Table 'shop.foo' doesn't exist"
        );
    }

    #[test]
    fn test_error_suggestions() {
        assert!(ServerError::auth("Login failed").suggestion().is_some());
        assert!(ServerError::Internal("unknown".to_string()).suggestion().is_none());
    }

    #[test]
    fn test_pool_errors_are_connection_errors() {
        let err: ServerError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, ServerError::Connection { .. }));
    }
}
