use crate::error::DataError;
use crate::row::ResultSet;
use crate::value::SqlParams;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future used by the object-safe driver and cache contracts.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An open database connection, exclusively owned by one session.
///
/// Statements execute in the order issued; there is no internal reordering
/// or batching across calls. The optional `timeout` is a per-call budget
/// forwarded from the caller; enforcing it is the implementation's job,
/// this layer never imposes its own timeout or retry.
pub trait Connection: Send {
    /// Execute one statement and return its rows.
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a SqlParams,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<ResultSet, DataError>>;

    /// Execute a multi-statement batch as one ordered round trip, yielding
    /// one result set per statement.
    fn query_batch<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a SqlParams,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<Vec<ResultSet>, DataError>>;

    /// Execute a statement, returning the number of affected rows.
    fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a SqlParams,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<u64, DataError>>;

    fn begin(&mut self) -> BoxFuture<'_, Result<(), DataError>>;

    fn commit(&mut self) -> BoxFuture<'_, Result<(), DataError>>;

    fn rollback(&mut self) -> BoxFuture<'_, Result<(), DataError>>;

    /// Close the connection. Further use is an error.
    fn close(&mut self) -> BoxFuture<'_, Result<(), DataError>>;
}

/// Opens connections by logical name.
///
/// One implementation per database product. A missing or blank connection
/// string, or a driver that fails to produce a connection, is a
/// [`DataError::Configuration`], reported immediately and never retried.
pub trait ConnectionProvider: Send + Sync {
    fn open<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Box<dyn Connection>, DataError>>;
}

/// A candidate connection name with a routing weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedTarget {
    pub name: String,
    pub weight: u32,
}

/// Resolves one target among weighted candidates.
///
/// Consumed-only contract: read/write routing layers implement this to pick
/// which provider serves a given read. This core is agnostic to how the
/// target was chosen.
pub trait TargetPicker: Send + Sync {
    fn pick<'a>(&self, candidates: &'a [WeightedTarget]) -> Option<&'a WeightedTarget>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HeaviestFirst;

    impl TargetPicker for HeaviestFirst {
        fn pick<'a>(&self, candidates: &'a [WeightedTarget]) -> Option<&'a WeightedTarget> {
            candidates.iter().max_by_key(|t| t.weight)
        }
    }

    #[test]
    fn picker_contract_resolves_one_candidate() {
        let candidates = vec![
            WeightedTarget {
                name: "replica-1".to_string(),
                weight: 1,
            },
            WeightedTarget {
                name: "replica-2".to_string(),
                weight: 5,
            },
        ];
        let picked = HeaviestFirst.pick(&candidates).unwrap();
        assert_eq!(picked.name, "replica-2");
        assert_eq!(HeaviestFirst.pick(&[]), None);
    }
}
