//! Blocking facade over the async session.
//!
//! Every method delegates to its async counterpart on a private
//! current-thread runtime, so the two surfaces cannot drift apart. Intended
//! for CLIs, tests, and other synchronous call sites; do not use it from
//! inside an async context.

use crate::cache::{CacheConfig, CacheKeyBuilder, CacheProvider};
use crate::connection::ConnectionProvider;
use crate::dialect::Dialect;
use crate::error::DataError;
use crate::page::PageResult;
use crate::row::{ResultSet, Row};
use crate::value::SqlParams;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub use crate::session::QueryOptions;

/// Blocking unit of work with the same semantics as [`crate::Session`].
pub struct Session {
    runtime: tokio::runtime::Runtime,
    inner: crate::session::Session,
}

/// Builds a blocking [`Session`]. Runtime construction can fail, so `build`
/// returns a `Result` here, unlike the async builder.
pub struct SessionBuilder {
    inner: crate::session::SessionBuilder,
}

impl SessionBuilder {
    pub fn connection_name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.connection_name(name);
        self
    }

    pub fn cache(mut self, provider: Arc<dyn CacheProvider>, config: CacheConfig) -> Self {
        self.inner = self.inner.cache(provider, config);
        self
    }

    pub fn cache_key_builder(mut self, keys: Arc<dyn CacheKeyBuilder>) -> Self {
        self.inner = self.inner.cache_key_builder(keys);
        self
    }

    pub fn build(self) -> Result<Session, DataError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DataError::Configuration(format!("failed to start runtime: {e}")))?;
        Ok(Session {
            runtime,
            inner: self.inner.build(),
        })
    }
}

impl Session {
    pub fn builder(provider: Arc<dyn ConnectionProvider>, dialect: Arc<dyn Dialect>) -> SessionBuilder {
        SessionBuilder {
            inner: crate::session::Session::builder(provider, dialect),
        }
    }

    pub fn connection_name(&self) -> &str {
        self.inner.connection_name()
    }

    pub fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    pub fn query<T>(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Vec<T>, DataError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.runtime.block_on(self.inner.query(sql, params, opts))
    }

    pub fn query_raw(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Vec<Row>, DataError> {
        self.runtime.block_on(self.inner.query_raw(sql, params, opts))
    }

    pub fn query_first<T>(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<T>, DataError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.runtime.block_on(self.inner.query_first(sql, params, opts))
    }

    pub fn query_first_raw(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<Row>, DataError> {
        self.runtime
            .block_on(self.inner.query_first_raw(sql, params, opts))
    }

    pub fn query_single<T>(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<T>, DataError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.runtime.block_on(self.inner.query_single(sql, params, opts))
    }

    pub fn query_single_raw(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<Row>, DataError> {
        self.runtime
            .block_on(self.inner.query_single_raw(sql, params, opts))
    }

    pub fn query_scalar<T>(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Option<T>, DataError>
    where
        T: DeserializeOwned,
    {
        self.runtime.block_on(self.inner.query_scalar(sql, params, opts))
    }

    pub fn execute(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<u64, DataError> {
        self.runtime.block_on(self.inner.execute(sql, params, opts))
    }

    pub fn query_multiple(
        &mut self,
        sql: &str,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<Vec<ResultSet>, DataError> {
        self.runtime
            .block_on(self.inner.query_multiple(sql, params, opts))
    }

    pub fn query_page<T>(
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
        self.runtime.block_on(self.inner.query_page(
            count_sql, data_sql, page_index, page_size, params, opts,
        ))
    }

    pub fn query_page_raw(
        &mut self,
        count_sql: &str,
        data_sql: &str,
        page_index: u64,
        page_size: u64,
        params: &SqlParams,
        opts: &QueryOptions,
    ) -> Result<PageResult<Row>, DataError> {
        self.runtime.block_on(self.inner.query_page_raw(
            count_sql, data_sql, page_index, page_size, params, opts,
        ))
    }

    pub fn begin_transaction(&mut self) -> Result<(), DataError> {
        self.runtime.block_on(self.inner.begin_transaction())
    }

    pub fn commit_transaction(&mut self) -> Result<(), DataError> {
        self.runtime.block_on(self.inner.commit_transaction())
    }

    pub fn rollback_transaction(&mut self) -> Result<(), DataError> {
        self.runtime.block_on(self.inner.rollback_transaction())
    }

    pub fn close(&mut self) -> Result<(), DataError> {
        self.runtime.block_on(self.inner.close())
    }

    /// Convenience for blocking call sites that want a per-call timeout
    /// without assembling options by hand.
    pub fn options_with_timeout(timeout: Duration) -> QueryOptions {
        QueryOptions::new().timeout(timeout)
    }
}
