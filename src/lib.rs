//! # MySQL Table Browser
//!
//! A generic browser for the tables of one MySQL database, served as a JSON
//! API.
//!
//! This crate provides:
//! - **Introspection**: list tables, column and primary key metadata read
//!   from `information_schema` on every call
//! - **Browsing**: paginated rows
//! - **Editing**: insert rows, update rows by primary key
//! - **Ad-hoc queries**: read-only `SELECT` statements with a row cap
//!
//! Table and column names are checked against an identifier whitelist before
//! they reach SQL text; values are always bound as parameters.

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod http;
pub mod security;
pub mod service;
pub mod shutdown;

pub use config::Config;
pub use error::ServerError;
pub use service::TableService;
