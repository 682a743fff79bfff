//! # sqlkit — session-scoped data access with caching and pagination
//!
//! A small data access layer built around a unit-of-work [`Session`]: one
//! lazily-opened connection, manual transactions, a cache-aside read path,
//! and a dialect-aware pagination engine. Database drivers plug in through
//! the [`Connection`] / [`ConnectionProvider`] traits (see `sqlkit-sqlx`),
//! caches through [`CacheProvider`] (see `sqlkit-cache`).
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Session`] | Async unit of work: lazy connection, manual transactions, cached reads |
//! | [`blocking::Session`] | Blocking facade delegating to the async session on a private runtime |
//! | [`QueryOptions`] | Per-call timeout and cache overrides |
//! | [`SqlParams`] / [`Value`] | Named parameter bag and its value model (see [`params!`]) |
//! | [`Row`] / [`ResultSet`] | Untyped result model; typed reads decode via serde |
//! | [`PageResult<T>`] | One page of results plus count/page metadata |
//! | [`dialect`] | Per-database paging conventions and count widths |
//! | [`CacheProvider`] / [`CacheKeyBuilder`] | Cache contract and stable key derivation |
//! | [`ConnectionStrings`] | Named connection strings, passed explicitly to providers |
//!
//! # Quick start
//!
//! ```ignore
//! use sqlkit::{params, CacheConfig, QueryOptions, Session};
//! use sqlkit_sqlx::SqliteProvider;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(SqliteProvider::new(connection_strings));
//! let mut session = Session::builder(provider, Arc::new(sqlkit::dialect::Sqlite)).build();
//!
//! let page = session
//!     .query_page::<Person>(
//!         "SELECT COUNT(*) FROM people",
//!         "SELECT id, name FROM people ORDER BY id LIMIT :Take OFFSET :Skip",
//!         2,
//!         10,
//!         &params! {},
//!         &QueryOptions::new(),
//!     )
//!     .await?;
//! assert_eq!(page.page, 2);
//!
//! session.close().await?;
//! ```
//!
//! # Caching
//!
//! Reads run a cache-aside protocol when the session is built with a cache:
//! one lookup, compute on miss, at most one store. A per-call
//! [`QueryOptions::cached`] overrides the configured default; without a
//! cache layer nothing is ever cached. Cache failures propagate; they are
//! never treated as a miss.
//!
//! # Pagination
//!
//! [`Session::query_page`] runs a caller-supplied count statement and data
//! statement as one batch. The session injects the dialect's paging
//! parameters (`Skip`/`Take` and, where the dialect supports them,
//! `TakeStart`/`TakeEnd`) so the data statement references whichever
//! convention fits its SQL.

pub mod blocking;
mod cache;
mod config;
mod connection;
pub mod dialect;
mod error;
mod page;
mod row;
mod session;
mod value;

pub use cache::{CacheConfig, CacheError, CacheKeyBuilder, CacheProvider, DefaultCacheKeyBuilder};
pub use config::{ConnectionStrings, DEFAULT_CONNECTION};
pub use connection::{BoxFuture, Connection, ConnectionProvider, TargetPicker, WeightedTarget};
pub use dialect::{CountWidth, Dialect};
pub use error::DataError;
pub use page::{PageBounds, PageResult};
pub use row::{decode_rows, ResultSet, Row};
pub use session::{QueryOptions, Session, SessionBuilder};
pub use value::{SqlParams, Value};

/// Commonly used imports.
pub mod prelude {
    pub use crate::cache::{CacheConfig, CacheProvider};
    pub use crate::connection::{Connection, ConnectionProvider};
    pub use crate::dialect::Dialect;
    pub use crate::error::DataError;
    pub use crate::page::PageResult;
    pub use crate::row::{ResultSet, Row};
    pub use crate::session::{QueryOptions, Session};
    pub use crate::value::{SqlParams, Value};
    pub use crate::params;
}
