use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use gavel_core::error::{DatasetError, Result};
use gavel_core::table::TableSource;

/// One question/answer pair of the evaluation dataset.
///
/// `predicted_answer` is written exactly once by the prediction stage;
/// the record is immutable afterwards within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: i64,
    pub question: String,
    /// Ground-truth answer. Loader output always has this set.
    #[serde(default)]
    pub expected_answer: Option<String>,
    /// Answer produced by the model under evaluation.
    #[serde(default)]
    pub predicted_answer: Option<String>,
    /// Supporting passage the answer should be grounded in.
    #[serde(default)]
    pub context: Option<String>,
}

impl EvaluationRecord {
    pub fn new(id: i64, question: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            id,
            question: question.into(),
            expected_answer: Some(expected.into()),
            predicted_answer: None,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_predicted_answer(mut self, answer: impl Into<String>) -> Self {
        self.predicted_answer = Some(answer.into());
        self
    }
}

const REQUIRED_COLUMNS: [&str; 3] = ["id", "question", "expected_answer"];

/// Loads the fixed-schema evaluation table and keeps only rows usable as
/// ground truth.
pub struct DatasetLoader {
    source: Arc<dyn TableSource>,
}

impl DatasetLoader {
    pub fn new(source: Arc<dyn TableSource>) -> Self {
        Self { source }
    }

    /// Read `table_ref` and return its rows as records, ordered as stored,
    /// filtered to those with a non-null expected answer.
    ///
    /// No retries; the caller decides what a read failure means.
    pub async fn load(&self, table_ref: &str) -> Result<Vec<EvaluationRecord>> {
        let rows = self.source.read_table(table_ref).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // Schema check over the union of keys: a column counts as present
        // if any row carries it, since null cells may be omitted per row.
        let columns: BTreeSet<&str> = rows
            .iter()
            .filter_map(|row| row.as_object())
            .flat_map(|obj| obj.keys().map(String::as_str))
            .collect();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !columns.contains(**c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::SchemaMismatch { missing }.into());
        }

        let mut records = Vec::new();
        for row in &rows {
            match parse_row(row) {
                Some(record) if record.expected_answer.is_some() => records.push(record),
                Some(record) => {
                    tracing::debug!(id = record.id, "excluding row with null expected_answer");
                }
                None => {
                    tracing::warn!(row = %row, "skipping malformed dataset row");
                }
            }
        }
        Ok(records)
    }
}

fn parse_row(row: &Value) -> Option<EvaluationRecord> {
    let obj = row.as_object()?;
    let id = obj.get("id")?.as_i64()?;
    let question = obj.get("question")?.as_str()?.to_string();
    Some(EvaluationRecord {
        id,
        question,
        expected_answer: text_column(obj.get("expected_answer")),
        predicted_answer: text_column(obj.get("predicted_answer")),
        context: text_column(obj.get("context")),
    })
}

/// Null, absent and empty-string cells all count as "no value".
fn text_column(cell: Option<&Value>) -> Option<String> {
    match cell {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_core::error::GavelError;
    use gavel_core::table::JsonTableSource;
    use serde_json::json;

    fn loader_with(rows: Vec<Value>) -> DatasetLoader {
        DatasetLoader::new(Arc::new(
            JsonTableSource::new().with_table("eval", rows),
        ))
    }

    #[tokio::test]
    async fn filters_null_expected_answers() {
        let loader = loader_with(vec![
            json!({"id": 1, "question": "What is an inverter?",
                   "expected_answer": "A device converting DC to AC",
                   "context": "Inverters convert DC to AC for home use"}),
            json!({"id": 2, "question": "What is a panel?",
                   "expected_answer": null, "context": "..."}),
            json!({"id": 3, "question": "What is a breaker?",
                   "expected_answer": "A safety switch", "context": null}),
        ]);

        let records = loader.load("eval").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 3);
        assert!(records.iter().all(|r| r.expected_answer.is_some()));
        assert!(records[1].context.is_none());
    }

    #[tokio::test]
    async fn preserves_row_order() {
        let loader = loader_with(vec![
            json!({"id": 9, "question": "a", "expected_answer": "x"}),
            json!({"id": 3, "question": "b", "expected_answer": "y"}),
        ]);
        let records = loader.load("eval").await.unwrap();
        assert_eq!(records[0].id, 9);
        assert_eq!(records[1].id, 3);
    }

    #[tokio::test]
    async fn unreadable_source() {
        let loader = DatasetLoader::new(Arc::new(JsonTableSource::new()));
        let err = loader.load("missing").await.unwrap_err();
        assert!(matches!(
            err,
            GavelError::Dataset(DatasetError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn schema_mismatch_reports_missing_columns() {
        let loader = loader_with(vec![json!({"id": 1, "text": "not a question"})]);
        let err = loader.load("eval").await.unwrap_err();
        match err {
            GavelError::Dataset(DatasetError::SchemaMismatch { missing }) => {
                assert_eq!(missing, vec!["question", "expected_answer"]);
            }
            other => panic!("expected SchemaMismatch, got {other}"),
        }
    }

    #[tokio::test]
    async fn empty_table_is_empty_dataset() {
        let loader = loader_with(vec![]);
        let records = loader.load("eval").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn empty_string_expected_answer_is_filtered() {
        let loader = loader_with(vec![
            json!({"id": 1, "question": "q", "expected_answer": "  "}),
            json!({"id": 2, "question": "q", "expected_answer": "real"}),
        ]);
        let records = loader.load("eval").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 2);
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = EvaluationRecord::new(1, "q", "a").with_context("c");
        let json = serde_json::to_string(&record).unwrap();
        let parsed: EvaluationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
