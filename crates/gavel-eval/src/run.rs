use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::dataset::EvaluationRecord;
use crate::metric::MetricResult;

/// Immutable snapshot of one scored evaluation. The unit a promotion
/// decision is made against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRun {
    pub run_id: Uuid,
    pub run_name: String,
    /// Registered name of the model the predictions came from.
    pub model_name: String,
    pub created_at: DateTime<Utc>,
    /// The scored records, in dataset order.
    pub records: Vec<EvaluationRecord>,
    pub metrics: Vec<MetricResult>,
    /// Records the prediction stage flagged and excluded.
    pub prediction_failures: usize,
}

impl EvaluationRun {
    /// The metrics set is only valid if every record was scored by every
    /// configured metric. Skips (missing context, unparseable judge
    /// output) make the run incomplete, not invalid to inspect.
    pub fn is_complete(&self) -> bool {
        let all_ids: BTreeSet<i64> = self.records.iter().map(|r| r.id).collect();
        self.metrics.iter().all(|m| {
            let scored: BTreeSet<i64> = m.scored_record_ids().collect();
            scored == all_ids
        })
    }

    pub fn metric(&self, name: &str) -> Option<&MetricResult> {
        self.metrics.iter().find(|m| m.metric == name)
    }

    pub fn mean(&self, metric_name: &str) -> Option<f64> {
        self.metric(metric_name).map(|m| m.mean)
    }
}

/// Human-readable aggregate report. Per-record scores stay in the
/// snapshot; a successful run reports aggregates only.
impl fmt::Display for EvaluationRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run '{}' ({}) of model '{}': {} records, {} prediction failures",
            self.run_name,
            self.run_id,
            self.model_name,
            self.records.len(),
            self.prediction_failures
        )?;
        for m in &self.metrics {
            writeln!(
                f,
                "  {}: mean={:.3} variance={:.3} scored={} skipped={}",
                m.metric,
                m.mean,
                m.variance,
                m.scores.len(),
                m.skipped.len()
            )?;
        }
        Ok(())
    }
}
