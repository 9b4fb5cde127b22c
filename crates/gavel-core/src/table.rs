use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{DatasetError, Result};

/// Trait for tabular storage.
///
/// Rows are JSON objects keyed by column name. The backing store (managed
/// table, file, in-memory fixture) is opaque to the workflow.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Read all rows of the given table.
    async fn read_table(&self, table_ref: &str) -> Result<Vec<Value>>;
}

/// In-memory table source backed by JSON rows. Used programmatically and
/// as a test double.
#[derive(Debug, Default)]
pub struct JsonTableSource {
    tables: HashMap<String, Vec<Value>>,
}

impl JsonTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table_ref: impl Into<String>, rows: Vec<Value>) -> Self {
        self.tables.insert(table_ref.into(), rows);
        self
    }
}

#[async_trait]
impl TableSource for JsonTableSource {
    async fn read_table(&self, table_ref: &str) -> Result<Vec<Value>> {
        self.tables
            .get(table_ref)
            .cloned()
            .ok_or_else(|| DatasetError::Unavailable(format!("no such table: {table_ref}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GavelError;
    use serde_json::json;

    #[tokio::test]
    async fn read_existing_table() {
        let source = JsonTableSource::new()
            .with_table("eval", vec![json!({"id": 1, "question": "q"})]);
        let rows = source.read_table("eval").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["question"], json!("q"));
    }

    #[tokio::test]
    async fn missing_table_is_unavailable() {
        let source = JsonTableSource::new();
        let err = source.read_table("nope").await.unwrap_err();
        assert!(matches!(
            err,
            GavelError::Dataset(DatasetError::Unavailable(_))
        ));
    }
}
