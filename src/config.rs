//! Configuration management for the table browser.
//!
//! Configuration is loaded from environment variables following the 12-factor app pattern.

use crate::constants::{
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_DRAIN_TIMEOUT,
    DEFAULT_DRAIN_TIMEOUT_SECS,
    DEFAULT_HTTP_HOST, DEFAULT_HTTP_PORT, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_QUERY_LENGTH, DEFAULT_MIN_CONNECTIONS,
    DEFAULT_MYSQL_PORT, DEFAULT_PAGE_SIZE, DEFAULT_QUERY_ROW_CAP, DEFAULT_QUERY_TIMEOUT,
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};
use crate::error::ServerError;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection configuration
    pub database: DatabaseConfig,

    /// Paging and ad-hoc query limits
    pub browse: BrowseConfig,

    /// HTTP server configuration
    pub http: HttpConfig,

    /// Shutdown behaviour
    pub shutdown: ShutdownConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// MySQL hostname or IP address
    pub host: String,

    /// MySQL port (default: 3306)
    pub port: u16,

    /// Schema selected on every connection; `DATABASE()` resolves to it
    pub database: String,

    /// Username (optional; the driver default is used when absent)
    pub username: Option<String>,

    /// Password
    pub password: Option<String>,

    /// TLS negotiation mode
    pub ssl_mode: SslMode,

    /// Connection pool configuration
    pub pool: PoolConfig,

    /// Per-statement timeout
    pub query_timeout: Duration,
}

/// TLS negotiation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Never use TLS.
    Disabled,
    /// Use TLS when the server offers it.
    #[default]
    Preferred,
    /// Fail unless TLS can be established.
    Required,
}

impl FromStr for SslMode {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disabled" | "disable" | "off" | "false" => Ok(SslMode::Disabled),
            "preferred" | "prefer" => Ok(SslMode::Preferred),
            "required" | "require" | "on" | "true" => Ok(SslMode::Required),
            other => Err(ServerError::config(format!(
                "Invalid MYSQL_SSL_MODE '{}': expected disabled, preferred or required",
                other
            ))),
        }
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Timeout for acquiring a connection
    pub connection_timeout: Duration,

    /// Idle connection timeout
    pub idle_timeout: Duration,
}

/// Paging and ad-hoc query limits.
#[derive(Debug, Clone)]
pub struct BrowseConfig {
    /// Page size used when the caller gives none
    pub default_page_size: i64,

    /// Upper bound for a requested page size
    pub max_page_size: i64,

    /// Row cap applied to ad-hoc SELECT statements
    pub query_row_cap: usize,

    /// Maximum ad-hoc statement length (bytes)
    pub max_query_length: usize,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Enable CORS.
    pub enable_cors: bool,

    /// Allowed origins for CORS (empty means all).
    pub cors_origins: Vec<String>,

    /// Enable request tracing via tower-http TraceLayer.
    pub enable_tracing: bool,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

/// Shutdown configuration.
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// How long in-flight requests may take after a shutdown signal
    pub drain_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// ## Required
    /// - `MYSQL_HOST`: MySQL hostname
    /// - `MYSQL_DATABASE`: Schema to browse
    ///
    /// ## Optional
    /// - `MYSQL_PORT`: Port number (default: 3306)
    /// - `MYSQL_USER` / `MYSQL_PASSWORD`: Credentials
    /// - `MYSQL_SSL_MODE`: disabled, preferred or required (default: preferred)
    /// - `MYSQL_POOL_MIN`: Minimum pool connections (default: 1)
    /// - `MYSQL_POOL_MAX`: Maximum pool connections (default: 10)
    /// - `MYSQL_CONNECT_TIMEOUT`: Connection timeout in seconds (default: 30)
    /// - `MYSQL_IDLE_TIMEOUT`: Idle connection timeout in seconds (default: 600)
    /// - `MYSQL_QUERY_TIMEOUT`: Per-statement timeout in seconds (default: 30)
    /// - `BROWSER_DEFAULT_PAGE_SIZE`: Rows per page when none is given (default: 100)
    /// - `BROWSER_MAX_PAGE_SIZE`: Largest page a caller may request (default: 500)
    /// - `BROWSER_QUERY_ROW_CAP`: Row cap for ad-hoc SELECTs (default: 200)
    /// - `BROWSER_MAX_QUERY_LENGTH`: Maximum ad-hoc statement length (default: 100000)
    /// - `BROWSER_HTTP_*`: See [`HttpConfig::from_env`]
    /// - `BROWSER_SHUTDOWN_DRAIN_TIMEOUT`: Drain timeout in seconds (default: 30)
    pub fn from_env() -> Result<Self, ServerError> {
        let host = std::env::var("MYSQL_HOST")
            .map_err(|_| ServerError::config("MYSQL_HOST environment variable is required"))?;

        let database = std::env::var("MYSQL_DATABASE")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ServerError::config("MYSQL_DATABASE environment variable is required"))?;

        let username = std::env::var("MYSQL_USER").ok();
        let password = std::env::var("MYSQL_PASSWORD").ok();
        if username.is_none() && password.is_some() {
            return Err(ServerError::config(
                "MYSQL_USER is required when MYSQL_PASSWORD is set",
            ));
        }

        let ssl_mode = match std::env::var("MYSQL_SSL_MODE") {
            Ok(mode) => mode.parse()?,
            Err(_) => SslMode::default(),
        };

        let min_connections = env_parse("MYSQL_POOL_MIN").unwrap_or(DEFAULT_MIN_CONNECTIONS);
        let max_connections = env_parse("MYSQL_POOL_MAX")
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
            .max(1);
        if min_connections > max_connections {
            return Err(ServerError::config(format!(
                "MYSQL_POOL_MIN ({}) cannot exceed MYSQL_POOL_MAX ({})",
                min_connections, max_connections
            )));
        }

        let connection_timeout_secs =
            env_parse("MYSQL_CONNECT_TIMEOUT").unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS);
        let idle_timeout_secs = env_parse("MYSQL_IDLE_TIMEOUT").unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS);
        let query_timeout_secs = env_parse("MYSQL_QUERY_TIMEOUT").unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS);

        let browse = BrowseConfig::from_env()?;

        let drain_timeout_secs =
            env_parse("BROWSER_SHUTDOWN_DRAIN_TIMEOUT").unwrap_or(DEFAULT_DRAIN_TIMEOUT_SECS);

        Ok(Config {
            database: DatabaseConfig {
                host,
                port: env_parse("MYSQL_PORT").unwrap_or(DEFAULT_MYSQL_PORT),
                database,
                username,
                password,
                ssl_mode,
                pool: PoolConfig {
                    min_connections,
                    max_connections,
                    connection_timeout: Duration::from_secs(connection_timeout_secs),
                    idle_timeout: Duration::from_secs(idle_timeout_secs),
                },
                query_timeout: Duration::from_secs(query_timeout_secs),
            },
            browse,
            http: HttpConfig::from_env(),
            shutdown: ShutdownConfig {
                drain_timeout: Duration::from_secs(drain_timeout_secs),
            },
        })
    }
}

impl DatabaseConfig {
    /// Configuration for a local server with default settings.
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MYSQL_PORT,
            database: database.into(),
            username: None,
            password: None,
            ssl_mode: SslMode::default(),
            pool: PoolConfig::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl BrowseConfig {
    fn from_env() -> Result<Self, ServerError> {
        let max_page_size: i64 = env_parse("BROWSER_MAX_PAGE_SIZE").unwrap_or(MAX_PAGE_SIZE);
        if max_page_size < MIN_PAGE_SIZE {
            return Err(ServerError::config(format!(
                "BROWSER_MAX_PAGE_SIZE must be at least {}",
                MIN_PAGE_SIZE
            )));
        }

        let default_page_size = env_parse("BROWSER_DEFAULT_PAGE_SIZE")
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(MIN_PAGE_SIZE, max_page_size);

        let query_row_cap: usize = env_parse("BROWSER_QUERY_ROW_CAP").unwrap_or(DEFAULT_QUERY_ROW_CAP);
        if query_row_cap == 0 {
            return Err(ServerError::config("BROWSER_QUERY_ROW_CAP must be at least 1"));
        }

        Ok(Self {
            default_page_size,
            max_page_size,
            query_row_cap,
            max_query_length: env_parse("BROWSER_MAX_QUERY_LENGTH")
                .unwrap_or(DEFAULT_MAX_QUERY_LENGTH),
        })
    }
}

impl HttpConfig {
    /// Create configuration from environment variables.
    ///
    /// - `BROWSER_HTTP_HOST` (default: 127.0.0.1), `BROWSER_HTTP_PORT` (default: 8080)
    /// - `BROWSER_HTTP_CORS`: enable CORS (default: false)
    /// - `BROWSER_HTTP_CORS_ORIGINS`: comma-separated allowed origins (empty means all)
    /// - `BROWSER_HTTP_TRACING`: request tracing (default: true)
    /// - `BROWSER_HTTP_TIMEOUT`: request timeout in seconds (default: 60)
    /// - `BROWSER_HTTP_MAX_BODY`: maximum body size in bytes (default: 2MB)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("BROWSER_HTTP_HOST") {
            config.host = host;
        }

        if let Some(port) = env_parse("BROWSER_HTTP_PORT") {
            config.port = port;
        }

        if let Some(cors) = env_flag("BROWSER_HTTP_CORS") {
            config.enable_cors = cors;
        }

        if let Ok(origins) = std::env::var("BROWSER_HTTP_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(tracing) = env_flag("BROWSER_HTTP_TRACING") {
            config.enable_tracing = tracing;
        }

        if let Some(timeout) = env_parse("BROWSER_HTTP_TIMEOUT") {
            config.request_timeout_seconds = timeout;
        }

        if let Some(size) = env_parse("BROWSER_HTTP_MAX_BODY") {
            config.max_body_size = size;
        }

        config
    }

    /// Socket address string to bind to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            query_row_cap: DEFAULT_QUERY_ROW_CAP,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            enable_cors: false,
            cors_origins: Vec::new(),
            enable_tracing: true,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "MYSQL_HOST",
        "MYSQL_PORT",
        "MYSQL_DATABASE",
        "MYSQL_USER",
        "MYSQL_PASSWORD",
        "MYSQL_SSL_MODE",
        "MYSQL_POOL_MIN",
        "MYSQL_POOL_MAX",
        "MYSQL_QUERY_TIMEOUT",
        "BROWSER_MAX_PAGE_SIZE",
        "BROWSER_DEFAULT_PAGE_SIZE",
        "BROWSER_QUERY_ROW_CAP",
        "BROWSER_HTTP_PORT",
        "BROWSER_HTTP_CORS",
        "BROWSER_HTTP_CORS_ORIGINS",
        "BROWSER_SHUTDOWN_DRAIN_TIMEOUT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn set_required() {
        std::env::set_var("MYSQL_HOST", "db.internal");
        std::env::set_var("MYSQL_DATABASE", "shop");
    }

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_ssl_mode_parsing() {
        assert_eq!("DISABLED".parse::<SslMode>().unwrap(), SslMode::Disabled);
        assert_eq!("preferred".parse::<SslMode>().unwrap(), SslMode::Preferred);
        assert_eq!("require".parse::<SslMode>().unwrap(), SslMode::Required);
        assert!("verify".parse::<SslMode>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        set_required();

        let config = Config::from_env().unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.database.database, "shop");
        assert_eq!(config.database.username, None);
        assert_eq!(config.database.ssl_mode, SslMode::Preferred);
        assert_eq!(config.database.query_timeout, Duration::from_secs(30));
        assert_eq!(config.browse.default_page_size, 100);
        assert_eq!(config.browse.max_page_size, 500);
        assert_eq!(config.browse.query_row_cap, 200);
        assert_eq!(config.http.bind_address(), "127.0.0.1:8080");
        assert!(!config.http.enable_cors);
        assert_eq!(config.shutdown.drain_timeout, Duration::from_secs(30));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_requires_host_and_database() {
        clear_env();
        assert!(matches!(Config::from_env(), Err(ServerError::Config(_))));

        std::env::set_var("MYSQL_HOST", "localhost");
        assert!(matches!(Config::from_env(), Err(ServerError::Config(_))));

        std::env::set_var("MYSQL_DATABASE", "  ");
        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        set_required();
        std::env::set_var("MYSQL_PORT", "3307");
        std::env::set_var("MYSQL_USER", "browser");
        std::env::set_var("MYSQL_PASSWORD", "secret");
        std::env::set_var("MYSQL_SSL_MODE", "required");
        std::env::set_var("MYSQL_POOL_MAX", "4");
        std::env::set_var("BROWSER_MAX_PAGE_SIZE", "50");
        std::env::set_var("BROWSER_DEFAULT_PAGE_SIZE", "80");
        std::env::set_var("BROWSER_QUERY_ROW_CAP", "25");
        std::env::set_var("BROWSER_HTTP_PORT", "9000");
        std::env::set_var("BROWSER_HTTP_CORS", "true");
        std::env::set_var("BROWSER_HTTP_CORS_ORIGINS", "http://a.test, http://b.test,");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.database.username.as_deref(), Some("browser"));
        assert_eq!(config.database.password.as_deref(), Some("secret"));
        assert_eq!(config.database.ssl_mode, SslMode::Required);
        assert_eq!(config.database.pool.max_connections, 4);
        assert_eq!(config.browse.max_page_size, 50);
        // Default page size never exceeds the maximum.
        assert_eq!(config.browse.default_page_size, 50);
        assert_eq!(config.browse.query_row_cap, 25);
        assert_eq!(config.http.port, 9000);
        assert!(config.http.enable_cors);
        assert_eq!(config.http.cors_origins, vec!["http://a.test", "http://b.test"]);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_inconsistent_values() {
        clear_env();
        set_required();

        std::env::set_var("MYSQL_PASSWORD", "orphan");
        assert!(Config::from_env().is_err());
        std::env::remove_var("MYSQL_PASSWORD");

        std::env::set_var("MYSQL_POOL_MIN", "20");
        std::env::set_var("MYSQL_POOL_MAX", "5");
        assert!(Config::from_env().is_err());
        std::env::remove_var("MYSQL_POOL_MIN");
        std::env::remove_var("MYSQL_POOL_MAX");

        std::env::set_var("MYSQL_SSL_MODE", "sometimes");
        assert!(Config::from_env().is_err());
        std::env::remove_var("MYSQL_SSL_MODE");

        std::env::set_var("BROWSER_QUERY_ROW_CAP", "0");
        assert!(Config::from_env().is_err());

        clear_env();
    }
}
