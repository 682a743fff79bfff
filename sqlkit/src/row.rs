use crate::error::DataError;
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An untyped result row: column names in select order, one [`Value`] each.
///
/// This is the "untyped" half of the result model; every read operation has
/// a typed entry point that decodes rows into a caller type via serde, and a
/// `_raw` entry point that returns these rows as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    pub fn with_capacity(columns: usize) -> Self {
        Row {
            columns: Vec::with_capacity(columns),
            values: Vec::with_capacity(columns),
        }
    }

    /// Append a column. Backends push columns in select order.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The first column's value, used for scalar reads.
    pub fn first_value(&self) -> Option<&Value> {
        self.values.first()
    }

    /// Consume the row, yielding the first column's value.
    pub fn into_first_value(self) -> Option<Value> {
        self.values.into_iter().next()
    }

    /// Decode the row into `T` by treating it as a column-name → value map.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DataError> {
        let mut map = serde_json::Map::with_capacity(self.values.len());
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.insert(column.clone(), value.clone().into());
        }
        serde_json::from_value(serde_json::Value::Object(map)).map_err(DataError::decode)
    }
}

/// One result set of a statement or batch, materialized eagerly.
pub type ResultSet = Vec<Row>;

/// Decode every row of a result set into `T`.
pub fn decode_rows<T: DeserializeOwned>(rows: ResultSet) -> Result<Vec<T>, DataError> {
    rows.iter().map(Row::decode).collect()
}
