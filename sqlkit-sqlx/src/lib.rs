//! # sqlkit-sqlx — SQLx backend for sqlkit
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)-specific
//! implementations of sqlkit's driver contracts. It rewrites `:Name` / `@Name`
//! parameter references to the driver's placeholder syntax, splits multi-result
//! batches into ordered statements on one connection, and maps driver rows
//! into sqlkit's value model.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlxConnection`] | One `sqlx` connection adapted to sqlkit's `Connection` trait |
//! | [`SqlxConnectionProvider`] | Opens connections by logical name from [`ConnectionStrings`](sqlkit::ConnectionStrings) |
//! | [`SqliteProvider`] / [`PostgresProvider`] / [`MySqlProvider`] | Per-driver provider aliases |
//!
//! # Feature flags
//!
//! Enable the database drivers you need:
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! sqlkit-sqlx = { version = "0.1", features = ["sqlite"] }
//! ```
//!
//! ```ignore
//! use sqlkit::{dialect, params, ConnectionStrings, QueryOptions, Session};
//! use sqlkit_sqlx::SqliteProvider;
//! use std::sync::Arc;
//!
//! let strings = ConnectionStrings::new().with("default", "sqlite::memory:");
//! let provider = Arc::new(SqliteProvider::new(strings));
//! let mut session = Session::builder(provider, Arc::new(dialect::Sqlite)).build();
//!
//! session
//!     .execute(
//!         "INSERT INTO people (name) VALUES (:Name)",
//!         &params! { "Name" => "alice" },
//!         &QueryOptions::new(),
//!     )
//!     .await?;
//! session.close().await?;
//! ```

mod bind;
mod connection;
mod provider;

pub use connection::SqlxConnection;
pub use provider::SqlxConnectionProvider;

#[cfg(feature = "sqlite")]
pub use provider::SqliteProvider;

#[cfg(feature = "postgres")]
pub use provider::PostgresProvider;

#[cfg(feature = "mysql")]
pub use provider::MySqlProvider;
