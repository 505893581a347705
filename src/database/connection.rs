//! Connection pool management for MySQL.

use crate::config::{DatabaseConfig, SslMode};
use crate::error::ServerError;
use serde::Serialize;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use tracing::{debug, info};

/// Type alias for the connection pool.
pub type ConnectionPool = MySqlPool;

/// Build connect options from configuration.
pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .ssl_mode(match config.ssl_mode {
            SslMode::Disabled => MySqlSslMode::Disabled,
            SslMode::Preferred => MySqlSslMode::Preferred,
            SslMode::Required => MySqlSslMode::Required,
        });

    if let Some(username) = &config.username {
        options = options.username(username);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }

    options
}

fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .min_connections(config.pool.min_connections)
        .max_connections(config.pool.max_connections)
        .acquire_timeout(config.pool.connection_timeout)
        .idle_timeout(Some(config.pool.idle_timeout))
}

/// Create a connection pool from configuration.
///
/// Fails if the first connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<ConnectionPool, ServerError> {
    info!(
        "Creating connection pool for {}:{}/{} (min: {}, max: {})",
        config.host,
        config.port,
        config.database,
        config.pool.min_connections,
        config.pool.max_connections
    );

    let pool = pool_options(config)
        .connect_with(connect_options(config))
        .await
        .map_err(|e| match ServerError::from(e) {
            ServerError::Connection { message, source } => ServerError::Connection {
                message: format!("Failed to create connection pool: {}", message),
                source,
            },
            other => other,
        })?;

    debug!("Initial connection test successful");
    info!("Connection pool created successfully");
    Ok(pool)
}

/// Create a pool that connects on first use.
pub fn create_lazy_pool(config: &DatabaseConfig) -> ConnectionPool {
    pool_options(config).connect_lazy_with(connect_options(config))
}

/// Get pool health status.
pub fn pool_status(pool: &ConnectionPool) -> PoolStatus {
    let total = pool.size();
    let idle = pool.num_idle() as u32;
    PoolStatus {
        total_connections: total,
        idle_connections: idle,
        in_use_connections: total.saturating_sub(idle),
        max_connections: pool.options().get_max_connections(),
    }
}

/// Pool status information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    /// Total number of open connections.
    pub total_connections: u32,
    /// Number of idle connections.
    pub idle_connections: u32,
    /// Number of connections currently in use.
    pub in_use_connections: u32,
    /// Maximum allowed connections.
    pub max_connections: u32,
}
