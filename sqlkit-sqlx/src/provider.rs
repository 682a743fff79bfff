use crate::connection::SqlxConnection;
use sqlkit::{BoxFuture, Connection, ConnectionProvider, ConnectionStrings, DataError};
use sqlx::Connection as _;
use sqlx::Database;
use std::marker::PhantomData;

/// Opens driver connections by logical name from a set of connection
/// strings.
///
/// Holds no pool: each [`open`](ConnectionProvider::open) dials a fresh
/// connection that the session owns for its lifetime.
pub struct SqlxConnectionProvider<DB> {
    connections: ConnectionStrings,
    _marker: PhantomData<fn() -> DB>,
}

impl<DB> SqlxConnectionProvider<DB> {
    pub fn new(connections: ConnectionStrings) -> Self {
        SqlxConnectionProvider {
            connections,
            _marker: PhantomData,
        }
    }
}

impl<DB> ConnectionProvider for SqlxConnectionProvider<DB>
where
    DB: Database,
    SqlxConnection<DB>: Connection,
{
    fn open<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Box<dyn Connection>, DataError>> {
        Box::pin(async move {
            let url = self.connections.require(name)?;
            let conn = DB::Connection::connect(url).await.map_err(|e| {
                DataError::Configuration(format!("failed to open connection '{name}': {e}"))
            })?;
            tracing::debug!(name, driver = DB::NAME, "connection opened");
            Ok(Box::new(SqlxConnection::new(conn)) as Box<dyn Connection>)
        })
    }
}

#[cfg(feature = "sqlite")]
pub type SqliteProvider = SqlxConnectionProvider<sqlx::Sqlite>;

#[cfg(feature = "postgres")]
pub type PostgresProvider = SqlxConnectionProvider<sqlx::Postgres>;

#[cfg(feature = "mysql")]
pub type MySqlProvider = SqlxConnectionProvider<sqlx::MySql>;
