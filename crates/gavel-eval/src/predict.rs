use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gavel_core::message::Message;
use gavel_core::model::{CallOptions, ChatModel};

use crate::dataset::EvaluationRecord;

/// A record whose inference call failed. Flagged and excluded from
/// scoring; never aborts the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionFailure {
    pub record_id: i64,
    pub error: String,
}

/// Outcome of the prediction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionBatch {
    /// Records with `predicted_answer` populated, in input order.
    pub records: Vec<EvaluationRecord>,
    /// Records dropped due to inference errors.
    pub failures: Vec<PredictionFailure>,
}

impl PredictionBatch {
    pub fn is_fully_predicted(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Attaches a model answer to each evaluation record.
pub struct PredictionGenerator {
    model: Arc<dyn ChatModel>,
    max_concurrent: usize,
}

enum Outcome {
    Predicted(EvaluationRecord),
    Failed(PredictionFailure),
}

impl PredictionGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            max_concurrent: 4,
        }
    }

    /// Cap on in-flight inference calls. The calls are independent, so the
    /// only bound is the endpoint's rate limit.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    /// Invoke the model once per record and populate `predicted_answer`.
    ///
    /// Records that already carry a prediction are passed through
    /// untouched, so a resumed run does not re-pay inference cost.
    /// Output order matches input order.
    pub async fn predict(&self, records: Vec<EvaluationRecord>) -> PredictionBatch {
        let outcomes: Vec<Outcome> = futures::stream::iter(records)
            .map(|record| self.predict_one(record))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut batch = PredictionBatch {
            records: Vec::new(),
            failures: Vec::new(),
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Predicted(record) => batch.records.push(record),
                Outcome::Failed(failure) => {
                    tracing::warn!(
                        record_id = failure.record_id,
                        error = %failure.error,
                        "inference failed, record excluded from scoring"
                    );
                    batch.failures.push(failure);
                }
            }
        }
        batch
    }

    async fn predict_one(&self, mut record: EvaluationRecord) -> Outcome {
        if record.predicted_answer.is_some() {
            return Outcome::Predicted(record);
        }

        let messages = vec![Message::user(record.question.clone())];
        match self.model.generate(&messages, &CallOptions::default()).await {
            Ok(result) => {
                record.predicted_answer = Some(result.message.content().to_string());
                Outcome::Predicted(record)
            }
            Err(e) => Outcome::Failed(PredictionFailure {
                record_id: record.id,
                error: e.to_string(),
            }),
        }
    }
}
