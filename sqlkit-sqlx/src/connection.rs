use crate::bind::{self, ExpandedSql, Placeholder};
use sqlkit::{BoxFuture, Connection, DataError, ResultSet, Row, SqlParams, Value};
use sqlx::{Arguments, Column, Database, Executor, IntoArguments, Row as _, TypeInfo, ValueRef};
use std::future::Future;
use std::time::Duration;

/// Affected-row extraction. `sqlx` exposes `rows_affected` on each driver's
/// query result type rather than on a shared trait.
pub(crate) trait QueryResultExt {
    fn affected(&self) -> u64;
}

#[cfg(feature = "sqlite")]
impl QueryResultExt for sqlx::sqlite::SqliteQueryResult {
    fn affected(&self) -> u64 {
        self.rows_affected()
    }
}

#[cfg(feature = "postgres")]
impl QueryResultExt for sqlx::postgres::PgQueryResult {
    fn affected(&self) -> u64 {
        self.rows_affected()
    }
}

#[cfg(feature = "mysql")]
impl QueryResultExt for sqlx::mysql::MySqlQueryResult {
    fn affected(&self) -> u64 {
        self.rows_affected()
    }
}

/// A single `sqlx` connection adapted to the [`Connection`] contract.
///
/// Generic over the driver; the scalar bounds below are satisfied by every
/// driver this crate's features enable. The connection is `None` once
/// closed.
pub struct SqlxConnection<DB: Database> {
    conn: Option<DB::Connection>,
}

impl<DB: Database> SqlxConnection<DB> {
    pub fn new(conn: DB::Connection) -> Self {
        SqlxConnection { conn: Some(conn) }
    }

    fn conn_mut(&mut self) -> Result<&mut DB::Connection, DataError> {
        self.conn.as_mut().ok_or(DataError::Closed)
    }
}

/// Apply the per-call budget, if any. An elapsed budget surfaces as a
/// database error carrying the timeout's source.
async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> Result<T, DataError>
where
    F: Future<Output = Result<T, DataError>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(elapsed) => Err(DataError::database(elapsed)),
        },
        None => fut.await,
    }
}

/// Bind values in reference order. Values are bound as owned clones so the
/// argument buffer does not borrow the expansion.
fn build_arguments<'q, DB>(values: &[Value]) -> Result<DB::Arguments<'q>, DataError>
where
    DB: Database,
    bool: for<'a> sqlx::Encode<'a, DB> + sqlx::Type<DB>,
    i64: for<'a> sqlx::Encode<'a, DB> + sqlx::Type<DB>,
    f64: for<'a> sqlx::Encode<'a, DB> + sqlx::Type<DB>,
    String: for<'a> sqlx::Encode<'a, DB> + sqlx::Type<DB>,
    Vec<u8>: for<'a> sqlx::Encode<'a, DB> + sqlx::Type<DB>,
    Option<i64>: for<'a> sqlx::Encode<'a, DB> + sqlx::Type<DB>,
{
    let mut args = DB::Arguments::default();
    for value in values {
        match value {
            Value::Null => args.add(Option::<i64>::None),
            Value::Bool(v) => args.add(*v),
            Value::Int(v) => args.add(*v),
            Value::Float(v) => args.add(*v),
            Value::Text(v) => args.add(v.clone()),
            Value::Blob(v) => args.add(v.clone()),
        }
        .map_err(DataError::Database)?;
    }
    Ok(args)
}

/// Decode one column into the value model by its declared type name.
///
/// Drivers disagree on names and on decode strictness, so the integer and
/// float arms pick the narrowest Rust type the driver will accept and widen
/// it. Anything unrecognized decodes as text.
fn decode_value<DB>(row: &DB::Row, index: usize) -> Result<Value, DataError>
where
    DB: Database,
    usize: sqlx::ColumnIndex<DB::Row>,
    bool: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i16: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i32: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i64: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    f32: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    f64: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    String: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    Vec<u8>: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
{
    let raw = row.try_get_raw(index).map_err(DataError::database)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "BOOL" | "BOOLEAN" => Value::Bool(row.try_get(index).map_err(DataError::database)?),
        "INT8" | "BIGINT" | "BIGINT UNSIGNED" => {
            Value::Int(row.try_get::<i64, _>(index).map_err(DataError::database)?)
        }
        // SQLite stores every integer as 64 bits under one type name.
        "INTEGER" if DB::NAME == "SQLite" => {
            Value::Int(row.try_get::<i64, _>(index).map_err(DataError::database)?)
        }
        "INT" | "INT4" | "INTEGER" | "SERIAL" | "MEDIUMINT" | "INT UNSIGNED"
        | "MEDIUMINT UNSIGNED" => Value::Int(
            row.try_get::<i32, _>(index).map_err(DataError::database)? as i64,
        ),
        "INT2" | "SMALLINT" | "TINYINT" | "SMALLINT UNSIGNED" | "TINYINT UNSIGNED" => Value::Int(
            row.try_get::<i16, _>(index).map_err(DataError::database)? as i64,
        ),
        "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" => {
            Value::Float(row.try_get::<f64, _>(index).map_err(DataError::database)?)
        }
        "REAL" if DB::NAME == "SQLite" => {
            Value::Float(row.try_get::<f64, _>(index).map_err(DataError::database)?)
        }
        "FLOAT4" | "FLOAT" | "REAL" => Value::Float(
            row.try_get::<f32, _>(index).map_err(DataError::database)? as f64,
        ),
        // Arbitrary-precision columns need an extra sqlx feature to decode
        // natively; read the text form and parse.
        "NUMERIC" | "DECIMAL" => {
            let text = row
                .try_get::<String, _>(index)
                .map_err(DataError::database)?;
            Value::Float(parse_numeric(&text)?)
        }
        "BLOB" | "BYTEA" | "BINARY" | "VARBINARY" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            Value::Blob(row.try_get::<Vec<u8>, _>(index).map_err(DataError::database)?)
        }
        _ => Value::Text(row.try_get::<String, _>(index).map_err(DataError::database)?),
    };
    Ok(value)
}

fn parse_numeric(text: &str) -> Result<f64, DataError> {
    text.trim().parse::<f64>().map_err(|_| {
        DataError::Decode(format!("numeric column value '{text}' is not a decimal number"))
    })
}

fn decode_row<DB>(row: &DB::Row) -> Result<Row, DataError>
where
    DB: Database,
    usize: sqlx::ColumnIndex<DB::Row>,
    bool: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i16: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i32: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i64: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    f32: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    f64: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    String: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    Vec<u8>: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
{
    let mut out = Row::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        out.push(column.name(), decode_value::<DB>(row, index)?);
    }
    Ok(out)
}

async fn fetch_set<DB>(
    conn: &mut DB::Connection,
    expanded: &ExpandedSql,
) -> Result<ResultSet, DataError>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    usize: sqlx::ColumnIndex<DB::Row>,
    bool: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i16: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i32: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i64: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    f32: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    f64: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    String: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    Vec<u8>: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    Option<i64>: for<'a> sqlx::Encode<'a, DB> + sqlx::Type<DB>,
{
    let args = build_arguments::<DB>(&expanded.values)?;
    let rows = sqlx::query_with::<DB, _>(&expanded.sql, args)
        .fetch_all(&mut *conn)
        .await
        .map_err(DataError::database)?;
    rows.iter().map(decode_row::<DB>).collect()
}

impl<DB> Connection for SqlxConnection<DB>
where
    DB: Database,
    DB::QueryResult: QueryResultExt,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    usize: sqlx::ColumnIndex<DB::Row>,
    bool: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i16: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i32: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    i64: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    f32: for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    f64: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    String: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    Vec<u8>: for<'a> sqlx::Encode<'a, DB> + for<'r> sqlx::Decode<'r, DB> + sqlx::Type<DB>,
    Option<i64>: for<'a> sqlx::Encode<'a, DB> + sqlx::Type<DB>,
{
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a SqlParams,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<ResultSet, DataError>> {
        Box::pin(async move {
            let expanded = bind::expand(sql, params, placeholder::<DB>())?;
            let conn = self.conn_mut()?;
            with_timeout(timeout, fetch_set::<DB>(conn, &expanded)).await
        })
    }

    fn query_batch<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a SqlParams,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<Vec<ResultSet>, DataError>> {
        Box::pin(async move {
            let statements = bind::split_statements(sql);
            let mut expanded = Vec::with_capacity(statements.len());
            for statement in &statements {
                expanded.push(bind::expand(statement, params, placeholder::<DB>())?);
            }
            let conn = self.conn_mut()?;
            with_timeout(timeout, async move {
                let mut sets = Vec::with_capacity(expanded.len());
                // Statements run in order on the one connection, so a batch
                // stays inside the session's transaction scope.
                for statement in &expanded {
                    sets.push(fetch_set::<DB>(conn, statement).await?);
                }
                Ok(sets)
            })
            .await
        })
    }

    fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a SqlParams,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<u64, DataError>> {
        Box::pin(async move {
            let expanded = bind::expand(sql, params, placeholder::<DB>())?;
            let conn = self.conn_mut()?;
            with_timeout(timeout, async move {
                let args = build_arguments::<DB>(&expanded.values)?;
                let result = sqlx::query_with::<DB, _>(&expanded.sql, args)
                    .execute(&mut *conn)
                    .await
                    .map_err(DataError::database)?;
                Ok(result.affected())
            })
            .await
        })
    }

    fn begin(&mut self) -> BoxFuture<'_, Result<(), DataError>> {
        Box::pin(async move {
            let conn = self.conn_mut()?;
            conn.execute("BEGIN").await.map_err(DataError::database)?;
            Ok(())
        })
    }

    fn commit(&mut self) -> BoxFuture<'_, Result<(), DataError>> {
        Box::pin(async move {
            let conn = self.conn_mut()?;
            conn.execute("COMMIT").await.map_err(DataError::database)?;
            Ok(())
        })
    }

    fn rollback(&mut self) -> BoxFuture<'_, Result<(), DataError>> {
        Box::pin(async move {
            let conn = self.conn_mut()?;
            conn.execute("ROLLBACK").await.map_err(DataError::database)?;
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), DataError>> {
        Box::pin(async move {
            if let Some(conn) = self.conn.take() {
                sqlx::Connection::close(conn)
                    .await
                    .map_err(DataError::database)?;
            }
            Ok(())
        })
    }
}

fn placeholder<DB: Database>() -> Placeholder {
    bind::placeholder_for(DB::NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_parses_to_float() {
        assert_eq!(parse_numeric("12.50").unwrap(), 12.5);
        assert_eq!(parse_numeric(" -3 ").unwrap(), -3.0);
        assert_eq!(parse_numeric("0.000001").unwrap(), 0.000001);
    }

    #[test]
    fn malformed_numeric_is_a_decode_error() {
        let err = parse_numeric("12,50").unwrap_err();
        assert!(matches!(err, DataError::Decode(_)));
    }
}
