//! Database connectivity, introspection and statement execution.

pub mod builder;
mod connection;
pub mod metadata;
mod query;
pub mod types;

pub use builder::{Page, Statement};
pub use connection::{
    connect_options, create_lazy_pool, create_pool, pool_status, ConnectionPool, PoolStatus,
};
pub use metadata::{ColumnMeta, MetadataQueries, TableMeta};
pub use query::{ColumnInfo, QueryExecutor, QueryResult, ResultRow};
pub use types::{SqlValue, TypeMapper};
