use crate::cache::{CacheConfig, CacheKeyBuilder, CacheProvider, DefaultCacheKeyBuilder};
use crate::config::DEFAULT_CONNECTION;
use crate::connection::{BoxFuture, Connection, ConnectionProvider};
use crate::dialect::{read_count, Dialect};
use crate::error::DataError;
use crate::page::{assemble_batch, PageBounds, PageResult};
use crate::row::{decode_rows, ResultSet, Row};
use crate::value::SqlParams;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Per-call execution options: statement timeout and cache overrides.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Per-call budget forwarded to the statement-execution step.
    /// Enforcement is the connection provider's responsibility.
    pub timeout: Option<Duration>,
    /// Explicit cache toggle. `None` falls back to the session's
    /// [`CacheConfig::all_methods_enable_cache`].
    pub cache: Option<bool>,
    /// Explicit cache key, replacing the derived statement hash.
    pub cache_key: Option<String>,
    /// Per-call expiry, replacing the configured default.
    pub cache_expire: Option<Duration>,
}

impl QueryOptions {
    pub fn new() -> Self {
        QueryOptions::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cached(mut self, enable: bool) -> Self {
        self.cache = Some(enable);
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn cache_expire(mut self, expire: Duration) -> Self {
        self.cache_expire = Some(expire);
        self
    }
}

/// Explicit connection lifecycle: opened once on first use, closed once at
/// teardown.
enum ConnectionState {
    Uninitialized,
    Open(Box<dyn Connection>),
    Closed,
}

struct CacheLayer {
    provider: Arc<dyn CacheProvider>,
    keys: Arc<dyn CacheKeyBuilder>,
    config: CacheConfig,
}

/// Resolved cache decision for one call: where to look, under which key,
/// and how long to keep a stored result.
struct CachePlan {
    provider: Arc<dyn CacheProvider>,
    key: String,
    expire: Option<Duration>,
}

/// A unit of work: one lazily-opened connection plus an optional manual
/// transaction.
///
/// The connection is created on first use and reused for the session's
/// lifetime; statements execute in the order issued. Read operations run
/// through a cache-aside protocol when a cache layer is configured: look up
/// first, compute on miss, store the result. Every read has a typed entry
/// point (rows decoded into `T` via serde) and an untyped `_raw` twin.
///
/// # Example
///
/// ```ignore
/// let mut session = Session::builder(provider, Arc::new(dialect::Sqlite))
///     .cache(cache_provider, CacheConfig { all_methods_enable_cache: true, expire: None })
///     .build();
/// let people: Vec<Person> = session
///     .query("SELECT id, name FROM people WHERE id > :Id",
///            &params! { "Id" => 10i64 },
///            &QueryOptions::new())
///     .await?;
/// ```
pub struct Session {
    provider: Arc<dyn ConnectionProvider>,
    dialect: Arc<dyn Dialect>,
    connection_name: String,
    state: ConnectionState,
    tx_active: bool,
    cache: Option<CacheLayer>,
}

/// Builds a [`Session`]. All configuration is passed explicitly; there are
/// no ambient lookups.
pub struct SessionBuilder {
    provider: Arc<dyn ConnectionProvider>,
    dialect: Arc<dyn Dialect>,
    connection_name: String,
    cache: Option<(Arc<dyn CacheProvider>, CacheConfig)>,
    key_builder: Option<Arc<dyn CacheKeyBuilder>>,
}

impl SessionBuilder {
    pub fn connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = name.into();
        self
    }

    /// Enable the cache-aside layer. Without this call the session never
    /// touches a cache, regardless of per-call options.
    pub fn cache(mut self, provider: Arc<dyn CacheProvider>, config: CacheConfig) -> Self {
        self.cache = Some((provider, config));
        self
    }

    pub fn cache_key_builder(mut self, keys: Arc<dyn CacheKeyBuilder>) -> Self {
        self.key_builder = Some(keys);
        self
    }

    pub fn build(self) -> Session {
        let SessionBuilder {
            provider,
            dialect,
            connection_name,
            cache,
            key_builder,
        } = self;
        let cache = cache.map(|(provider, config)| CacheLayer {
            provider,
            keys: key_builder.unwrap_or_else(|| Arc::new(DefaultCacheKeyBuilder::new())),
            config,
        });
        Session {
            provider,
            dialect,
            connection_name,
            state: ConnectionState::Uninitialized,
            tx_active: false,
            cache,
        }
    }
}

impl Session {
    pub fn builder(provider: Arc<dyn ConnectionProvider>, dialect: Arc<dyn Dialect>) -> SessionBuilder {
        SessionBuilder {
            provider,
            dialect,
            connection_name: DEFAULT_CONNECTION.to_string(),
            cache: None,
            key_builder: None,
        }
    }

    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Whether a manual transaction is currently active.
    pub fn in_transaction(&self) -> bool {
        self.tx_active
    }

    /// Open the connection on first use. Using a closed session is an error.
    async fn connection(&mut self) -> Result<&mut Box<dyn Connection>, DataError> {
        match self.state {
            ConnectionState::Closed => return Err(DataError::Closed),
            ConnectionState::Uninitialized => {
                tracing::debug!(
                    connection = %self.connection_name,
                    dialect = self.dialect.name(),
                    "opening connection"
                );
                let conn = self.provider.open(&self.connection_name).await?;
                self.state = ConnectionState::Open(conn);
            }
            ConnectionState::Open(_) => {}
        }
        match &mut self.state {
            ConnectionState::Open(conn) => Ok(conn),
            _ => unreachable!("connection state was just opened"),
        }
    }

    /// Resolve whether this call is cached and under which key.
    ///
    /// Per-call toggle wins; otherwise the configured default applies; no
    /// cache layer at all means caching is unconditionally disabled. The
    /// key is derived from the caller's parameter bag, not the augmented
    /// one a page query executes with.
    fn cache_plan(
        &self,
        opts: &QueryOptions,
        sql: &str,
        params: &SqlParams,
        page: Option<(u64, u64)>,
    ) -> Option<CachePlan> {
        let layer = self.cache.as_ref()?;
        let enabled = opts.cache.unwrap_or(layer.config.all_methods_enable_cache);
        if !enabled {
            return None;
        }
        let (page_index, page_size) = match page {
            Some((index, size)) => (Some(index), Some(size)),
            None => (None, None),
        };
        let key = layer
            .keys
            .generate(sql, params, opts.cache_key.as_deref(), page_index, page_size);
        Some(CachePlan {
            provider: Arc::clone(&layer.provider),
            key,
            expire: opts.cache_expire.or(layer.config.expire),
        })
    }

    /// Cache-aside wrapper shared by every read operation.
    ///
    /// Exactly one cache read and at most one cache write per call; the
    /// query runs at most once. Concurrent calls with the same key may both
    /// miss and both write; last write wins. Cache failures propagate,
    /// they are never treated as a miss.
    async fn command_execute<T, F>(
        &mut self,
        opts: &QueryOptions,
        sql: &str,
        key_params: &SqlParams,
        exec_params: &SqlParams,
        page: Option<(u64, u64)>,
        run: F,
    ) -> Result<T, DataError>
    where
        T: Serialize + DeserializeOwned,
        F: for<'c> FnOnce(
            &'c mut dyn Connection,
            &'c str,
            &'c SqlParams,
            Option<Duration>,
        ) -> BoxFuture<'c, Result<T, DataError>>,
    {
        let plan = self.cache_plan(opts, sql, key_params, page);
        if let Some(plan) = &plan {
            if let Some(bytes) = plan.provider.try_get(&plan.key).await? {
                tracing::trace!(key = %plan.key, "cache hit");
                return serde_json::from_slice(&bytes).map_err(DataError::decode);
            }
            tracing::trace!(key = %plan.key, "cache miss");
        }
        let timeout = opts.timeout;
        let conn = self.connection().await?;
        let value = run(&mut **conn, sql, exec_params, timeout).await?;
        if let Some(plan) = plan {
            let bytes = serde_json::to_vec(&value).map_err(DataError::decode)?;
            plan.provider
                .try_set(&plan.key, Bytes::from(bytes), plan.expire)
                .await?;
            tracing::trace!(key = %plan.key, "stored result");
        }
        Ok(value)
    }

    /// Run a read statement, decoding every row into `T`.
    pub async fn query<T>(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Vec<T>, DataError>
    where
        T: Serialize + DeserializeOwned,
    {
        tracing::debug!(sql, "query");
        self.command_execute(opts, sql, params, params, None, |conn, sql, params, timeout| {
            Box::pin(async move {
                let rows = conn.query(sql, params, timeout).await?;
                decode_rows(rows)
            })
        })
        .await
    }

    /// Untyped twin of [`query`](Self::query).
    pub async fn query_raw(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Vec<Row>, DataError> {
        tracing::debug!(sql, "query_raw");
        self.command_execute(opts, sql, params, params, None, |conn, sql, params, timeout| {
            Box::pin(async move { conn.query(sql, params, timeout).await })
        })
        .await
    }

    /// First row decoded into `T`, or `None` when the statement returned no
    /// rows.
    pub async fn query_first<T>(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<T>, DataError>
    where
        T: Serialize + DeserializeOwned,
    {
        tracing::debug!(sql, "query_first");
        self.command_execute(opts, sql, params, params, None, |conn, sql, params, timeout| {
            Box::pin(async move {
                let rows = conn.query(sql, params, timeout).await?;
                rows.first().map(Row::decode).transpose()
            })
        })
        .await
    }

    /// Untyped twin of [`query_first`](Self::query_first).
    pub async fn query_first_raw(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<Row>, DataError> {
        tracing::debug!(sql, "query_first_raw");
        self.command_execute(opts, sql, params, params, None, |conn, sql, params, timeout| {
            Box::pin(async move {
                let rows = conn.query(sql, params, timeout).await?;
                Ok(rows.into_iter().next())
            })
        })
        .await
    }

    /// Exactly-one-row read: `None` when the statement returned nothing,
    /// an error when it returned more than one row.
    pub async fn query_single<T>(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<T>, DataError>
    where
        T: Serialize + DeserializeOwned,
    {
        tracing::debug!(sql, "query_single");
        self.command_execute(opts, sql, params, params, None, |conn, sql, params, timeout| {
            Box::pin(async move {
                let rows = conn.query(sql, params, timeout).await?;
                single_row(&rows)?;
                rows.first().map(Row::decode).transpose()
            })
        })
        .await
    }

    /// Untyped twin of [`query_single`](Self::query_single).
    pub async fn query_single_raw(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<Row>, DataError> {
        tracing::debug!(sql, "query_single_raw");
        self.command_execute(opts, sql, params, params, None, |conn, sql, params, timeout| {
            Box::pin(async move {
                let rows = conn.query(sql, params, timeout).await?;
                single_row(&rows)?;
                Ok(rows.into_iter().next())
            })
        })
        .await
    }

    /// Single scalar from the first column of the first row. Not cached.
    pub async fn query_scalar<T>(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<T>, DataError>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(sql, "query_scalar");
        let timeout = opts.timeout;
        let conn = self.connection().await?;
        let rows = conn.query(sql, params, timeout).await?;
        match rows.into_iter().next().and_then(Row::into_first_value) {
            Some(value) => serde_json::from_value(value.into())
                .map(Some)
                .map_err(DataError::decode),
            None => Ok(None),
        }
    }

    /// Execute a write statement, returning the number of affected rows.
    /// Not cached.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<u64, DataError> {
        tracing::debug!(sql, "execute");
        let timeout = opts.timeout;
        let conn = self.connection().await?;
        conn.execute(sql, params, timeout).await
    }

    /// Run a multi-statement batch as one ordered round trip, one result
    /// set per statement. Cache-eligible like the other reads; the key
    /// covers the whole batch text.
    pub async fn query_multiple(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Vec<ResultSet>, DataError> {
        tracing::debug!(sql, "query_multiple");
        self.command_execute(opts, sql, params, params, None, |conn, sql, params, timeout| {
            Box::pin(async move { conn.query_batch(sql, params, timeout).await })
        })
        .await
    }

    /// Run a count statement and a data statement as one round trip and
    /// decode the page's rows into `T`.
    ///
    /// The dialect's paging parameters are merged over the caller's bag
    /// before execution; the cache key (when caching applies) is derived
    /// from the caller's bag plus `(page_index, page_size)`.
    pub async fn query_page<T>(
        &mut self,
        count_sql: &str,
        data_sql: &str,
        page_index: u64,
        page_size: u64,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<PageResult<T>, DataError>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.query_page_with(count_sql, data_sql, page_index, page_size, params, opts, decode_rows)
            .await
    }

    /// Untyped twin of [`query_page`](Self::query_page).
    pub async fn query_page_raw(
        &mut self,
        count_sql: &str,
        data_sql: &str,
        page_index: u64,
        page_size: u64,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<PageResult<Row>, DataError> {
        self.query_page_with(count_sql, data_sql, page_index, page_size, params, opts, Ok)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn query_page_with<T, M>(
        &mut self,
        count_sql: &str,
        data_sql: &str,
        page_index: u64,
        page_size: u64,
        params: &SqlParams,
        opts: &QueryOptions,
        map_rows: M,
    ) -> Result<PageResult<T>, DataError>
    where
        T: Serialize + DeserializeOwned,
        M: FnOnce(ResultSet) -> Result<Vec<T>, DataError> + Send + 'static,
    {
        if page_index < 1 {
            return Err(DataError::InvalidInput(
                "page_index cannot be less than 1".to_string(),
            ));
        }
        if page_size < 1 {
            return Err(DataError::InvalidInput(
                "page_size cannot be less than 1".to_string(),
            ));
        }
        let bounds = PageBounds::new(page_index, page_size);
        let mut exec_params = params.clone();
        exec_params.merge(self.dialect.page_parameters(&bounds));
        let sql = assemble_batch(count_sql, data_sql);
        let width = self.dialect.count_width();
        tracing::debug!(sql = %sql, page_index, page_size, "query_page");
        self.command_execute(
            opts,
            &sql,
            params,
            &exec_params,
            Some((page_index, page_size)),
            move |conn, sql, params, timeout| {
                Box::pin(async move {
                    let mut sets = conn.query_batch(sql, params, timeout).await?.into_iter();
                    let count_set = sets.next().ok_or_else(|| {
                        DataError::Decode("page batch returned no count result set".to_string())
                    })?;
                    let data_set = sets.next().ok_or_else(|| {
                        DataError::Decode("page batch returned no data result set".to_string())
                    })?;
                    let total_count = read_count(&count_set, width)?;
                    let contents = map_rows(data_set)?;
                    Ok(PageResult::compute(total_count, page_index, page_size, contents))
                })
            },
        )
        .await
    }

    /// Begin a manual transaction bound to this session's connection.
    pub async fn begin_transaction(&mut self) -> Result<(), DataError> {
        if self.tx_active {
            return Err(DataError::Transaction(
                "a transaction is already active".to_string(),
            ));
        }
        let conn = self.connection().await?;
        conn.begin().await?;
        self.tx_active = true;
        tracing::debug!("transaction begun");
        Ok(())
    }

    /// Commit the active transaction. Requires a prior
    /// [`begin_transaction`](Self::begin_transaction).
    pub async fn commit_transaction(&mut self) -> Result<(), DataError> {
        if !self.tx_active {
            return Err(DataError::Transaction(
                "commit requires an active transaction; call begin_transaction first".to_string(),
            ));
        }
        let conn = self.connection().await?;
        conn.commit().await?;
        self.tx_active = false;
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// Roll back the active transaction. Requires a prior
    /// [`begin_transaction`](Self::begin_transaction).
    pub async fn rollback_transaction(&mut self) -> Result<(), DataError> {
        if !self.tx_active {
            return Err(DataError::Transaction(
                "rollback requires an active transaction; call begin_transaction first".to_string(),
            ));
        }
        let conn = self.connection().await?;
        conn.rollback().await?;
        self.tx_active = false;
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    /// Tear the session down: roll back a still-active transaction and
    /// close the connection if it was ever opened. Idempotent; the
    /// connection is closed exactly once.
    pub async fn close(&mut self) -> Result<(), DataError> {
        match std::mem::replace(&mut self.state, ConnectionState::Closed) {
            ConnectionState::Open(mut conn) => {
                if self.tx_active {
                    conn.rollback().await?;
                    self.tx_active = false;
                }
                conn.close().await?;
                tracing::debug!(connection = %self.connection_name, "connection closed");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn single_row(rows: &[Row]) -> Result<(), DataError> {
    if rows.len() > 1 {
        return Err(DataError::Decode(format!(
            "statement returned {} rows where at most one was expected",
            rows.len()
        )));
    }
    Ok(())
}

impl Drop for Session {
    fn drop(&mut self) {
        if matches!(self.state, ConnectionState::Open(_)) {
            tracing::warn!(
                connection = %self.connection_name,
                "session dropped while open; call close() to release the connection cleanly"
            );
        }
    }
}
