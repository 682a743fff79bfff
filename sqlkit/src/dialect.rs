use crate::error::DataError;
use crate::page::PageBounds;
use crate::row::Row;
use crate::value::Value;

/// Native width of the scalar produced by a dialect's count statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountWidth {
    I32,
    I64,
}

/// Per-database capabilities consumed by the pagination engine.
///
/// A small capability interface with one concrete implementation per
/// database product, selected at session construction.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parameters injected into the caller's bag before a page query runs.
    ///
    /// The default supplies both conventions (`Skip`/`Take` and
    /// `TakeStart`/`TakeEnd`), so statements written against either style
    /// work unmodified. Dialects may narrow this to the convention their
    /// SQL prefers.
    fn page_parameters(&self, bounds: &PageBounds) -> Vec<(String, Value)> {
        vec![
            ("TakeStart".to_string(), Value::Int(bounds.take_start as i64)),
            ("TakeEnd".to_string(), Value::Int(bounds.take_end as i64)),
            ("Skip".to_string(), Value::Int(bounds.skip as i64)),
            ("Take".to_string(), Value::Int(bounds.take as i64)),
        ]
    }

    fn count_width(&self) -> CountWidth {
        CountWidth::I64
    }
}

/// Read the total-count scalar from the first result set of a page batch.
///
/// An empty result set counts as zero. The value is normalized to 64 bits;
/// a dialect declaring a 32-bit count rejects values that would not fit its
/// native width.
pub(crate) fn read_count(count_set: &[Row], width: CountWidth) -> Result<u64, DataError> {
    let value = match count_set.first().and_then(Row::first_value) {
        Some(value) => value,
        None => return Ok(0),
    };
    let count = match value {
        Value::Int(n) => *n,
        Value::Null => 0,
        other => {
            return Err(DataError::Decode(format!(
                "count statement returned a non-integer value: {other:?}"
            )))
        }
    };
    if width == CountWidth::I32 && i32::try_from(count).is_err() {
        return Err(DataError::Decode(format!(
            "count {count} does not fit the dialect's 32-bit count width"
        )));
    }
    u64::try_from(count)
        .map_err(|_| DataError::Decode(format!("count statement returned a negative value: {count}")))
}

/// SQLite: OFFSET/LIMIT paging, 64-bit counts. Only the skip/take
/// convention is injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn page_parameters(&self, bounds: &PageBounds) -> Vec<(String, Value)> {
        vec![
            ("Skip".to_string(), Value::Int(bounds.skip as i64)),
            ("Take".to_string(), Value::Int(bounds.take as i64)),
        ]
    }
}

/// SQL Server: ROW_NUMBER-style windowing alongside OFFSET/FETCH, and
/// `COUNT(*)` comes back as a 32-bit int.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn count_width(&self) -> CountWidth {
        CountWidth::I32
    }
}

/// PostgreSQL: default conventions, 64-bit counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// MySQL: default conventions, 64-bit counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_row(value: Value) -> Vec<Row> {
        let mut row = Row::new();
        row.push("count", value);
        vec![row]
    }

    #[test]
    fn default_dialect_injects_both_conventions() {
        let params = SqlServer.page_parameters(&PageBounds::new(3, 20));
        let names: Vec<&str> = params.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["TakeStart", "TakeEnd", "Skip", "Take"]);
        assert_eq!(params[0].1, Value::Int(41));
        assert_eq!(params[1].1, Value::Int(60));
        assert_eq!(params[2].1, Value::Int(40));
        assert_eq!(params[3].1, Value::Int(20));
    }

    #[test]
    fn sqlite_injects_only_skip_take() {
        let params = Sqlite.page_parameters(&PageBounds::new(2, 10));
        let names: Vec<&str> = params.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Skip", "Take"]);
        assert_eq!(params[0].1, Value::Int(10));
        assert_eq!(params[1].1, Value::Int(10));
    }

    #[test]
    fn empty_count_set_defaults_to_zero() {
        assert_eq!(read_count(&[], CountWidth::I64).unwrap(), 0);
    }

    #[test]
    fn count_is_normalized_to_64_bits() {
        assert_eq!(
            read_count(&count_row(Value::Int(3_000_000_000)), CountWidth::I64).unwrap(),
            3_000_000_000
        );
    }

    #[test]
    fn narrow_count_width_rejects_overflow() {
        let err = read_count(&count_row(Value::Int(3_000_000_000)), CountWidth::I32).unwrap_err();
        assert!(matches!(err, DataError::Decode(_)));
    }

    #[test]
    fn negative_count_is_a_decode_error() {
        let err = read_count(&count_row(Value::Int(-1)), CountWidth::I64).unwrap_err();
        assert!(matches!(err, DataError::Decode(_)));
    }

    #[test]
    fn non_integer_count_is_a_decode_error() {
        let err = read_count(&count_row(Value::Text("25".into())), CountWidth::I64).unwrap_err();
        assert!(matches!(err, DataError::Decode(_)));
    }
}
