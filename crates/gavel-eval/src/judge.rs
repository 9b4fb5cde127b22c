use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use gavel_core::config::EvalConfig;
use gavel_core::error::{GavelError, JudgeError, Result};
use gavel_core::message::Message;
use gavel_core::model::{CallOptions, ChatModel};

use crate::dataset::EvaluationRecord;
use crate::metric::{MetricKind, MetricResult, RecordScore, SideMetrics, TOKEN_COUNT, TOXICITY};
use crate::run::EvaluationRun;

/// Scores predicted answers with an LLM judge across a fixed metric set
/// and aggregates the results into an [`EvaluationRun`].
///
/// One judge call per (record, metric). If the judge is unreachable the
/// whole run fails; this workflow gates a promotion decision, so no
/// partial run is ever produced.
pub struct JudgeScorer {
    judge: Arc<dyn ChatModel>,
    metrics: Vec<MetricKind>,
    side_metrics: Option<Arc<dyn SideMetrics>>,
}

impl JudgeScorer {
    pub fn new(judge: Arc<dyn ChatModel>) -> Self {
        Self {
            judge,
            metrics: MetricKind::all().to_vec(),
            side_metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Vec<MetricKind>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_side_metrics(mut self, side: Arc<dyn SideMetrics>) -> Self {
        self.side_metrics = Some(side);
        self
    }

    /// Score every record with every configured metric.
    ///
    /// Records must arrive with both an expected and a predicted answer.
    /// A record missing context is skipped by context-dependent metrics
    /// and still scored by the rest.
    pub async fn score(
        &self,
        records: Vec<EvaluationRecord>,
        config: &EvalConfig,
        prediction_failures: usize,
    ) -> Result<EvaluationRun> {
        for record in &records {
            if record.expected_answer.is_none() || record.predicted_answer.is_none() {
                return Err(GavelError::Other(format!(
                    "record {} reached the scorer without expected and predicted answers",
                    record.id
                )));
            }
        }

        let mut metrics = Vec::new();
        if !records.is_empty() {
            let options = CallOptions {
                temperature: Some(config.judge_temperature),
                ..CallOptions::default()
            };

            for metric in &self.metrics {
                metrics.push(self.score_metric(*metric, &records, &options).await?);
            }

            if let Some(side) = &self.side_metrics {
                let (tokens, toxicity) = self.score_side_metrics(side, &records).await?;
                metrics.push(tokens);
                metrics.push(toxicity);
            }
        }

        Ok(EvaluationRun {
            run_id: config.run_id,
            run_name: config.run_name.clone(),
            model_name: config.model_name.clone(),
            created_at: Utc::now(),
            records,
            metrics,
            prediction_failures,
        })
    }

    async fn score_metric(
        &self,
        metric: MetricKind,
        records: &[EvaluationRecord],
        options: &CallOptions,
    ) -> Result<MetricResult> {
        let mut scores = Vec::new();
        let mut skipped = Vec::new();

        for record in records {
            let prompt = match build_judge_prompt(metric, record) {
                Ok(prompt) => prompt,
                Err(JudgeError::MissingContext { record_id }) => {
                    tracing::debug!(
                        record_id,
                        metric = metric.name(),
                        "no context, metric skipped for record"
                    );
                    skipped.push(record_id);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let messages = vec![Message::user(prompt)];
            let result = self
                .judge
                .generate(&messages, options)
                .await
                .map_err(|e| JudgeError::Unavailable(e.to_string()))?;

            match parse_judge_score(result.message.content()) {
                Some((value, justification)) => scores.push(RecordScore {
                    record_id: record.id,
                    value,
                    justification,
                }),
                None => {
                    tracing::warn!(
                        record_id = record.id,
                        metric = metric.name(),
                        response = result.message.content(),
                        "unparseable judge response, record excluded from aggregate"
                    );
                    skipped.push(record.id);
                }
            }
        }

        Ok(MetricResult::aggregate(metric.name(), scores, skipped))
    }

    async fn score_side_metrics(
        &self,
        side: &Arc<dyn SideMetrics>,
        records: &[EvaluationRecord],
    ) -> Result<(MetricResult, MetricResult)> {
        let mut token_scores = Vec::new();
        let mut toxicity_scores = Vec::new();

        for record in records {
            let answer = record.predicted_answer.as_deref().unwrap_or_default();
            let tokens = side
                .token_count(answer)
                .await
                .map_err(|e| JudgeError::Unavailable(e.to_string()))?;
            let toxicity = side
                .toxicity(answer)
                .await
                .map_err(|e| JudgeError::Unavailable(e.to_string()))?;
            token_scores.push(RecordScore {
                record_id: record.id,
                value: tokens as f64,
                justification: None,
            });
            toxicity_scores.push(RecordScore {
                record_id: record.id,
                value: toxicity,
                justification: None,
            });
        }

        Ok((
            MetricResult::aggregate(TOKEN_COUNT, token_scores, vec![]),
            MetricResult::aggregate(TOXICITY, toxicity_scores, vec![]),
        ))
    }
}

/// Assemble the grading prompt for one (metric, record) pair.
fn build_judge_prompt(
    metric: MetricKind,
    record: &EvaluationRecord,
) -> std::result::Result<String, JudgeError> {
    let mut prompt = format!(
        "You are an impartial evaluator.\n\n{}\n\nGrade the answer on a scale of 1 to 5 \
         using this rubric:\n{}\n",
        metric.definition(),
        metric.rubric()
    );

    if let Some(example) = metric.few_shot_example() {
        prompt.push_str(&format!(
            "\nExample:\nQuestion: {}\nAnswer: {}\nScore: {}\nJustification: {}\n",
            example.input, example.output, example.score, example.justification
        ));
    }

    let predicted = record.predicted_answer.as_deref().unwrap_or_default();
    prompt.push('\n');
    match metric {
        MetricKind::AnswerCorrectness => {
            prompt.push_str(&format!(
                "Question: {}\nGround truth answer: {}\nAnswer: {}\n",
                record.question,
                record.expected_answer.as_deref().unwrap_or_default(),
                predicted
            ));
        }
        MetricKind::AnswerRelevance | MetricKind::Professionalism => {
            prompt.push_str(&format!(
                "Question: {}\nAnswer: {}\n",
                record.question, predicted
            ));
        }
        MetricKind::Faithfulness => {
            let context = record.context.as_deref().ok_or(JudgeError::MissingContext {
                record_id: record.id,
            })?;
            prompt.push_str(&format!("Context: {}\nAnswer: {}\n", context, predicted));
        }
    }

    prompt.push_str(
        "\nRespond with ONLY a JSON object: \
         {\"score\": <integer 1-5>, \"justification\": \"<reason>\"}",
    );
    Ok(prompt)
}

/// Parse the judge's response into a score and justification.
///
/// Tries strict JSON first, then falls back to the first number between
/// 1 and 5 found in the text. Returns `None` when nothing parses.
fn parse_judge_score(text: &str) -> Option<(f64, Option<String>)> {
    if let Ok(val) = serde_json::from_str::<Value>(text) {
        if let Some(score) = val.get("score").and_then(|v| v.as_f64()) {
            let justification = val
                .get("justification")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            return Some((score.clamp(1.0, 5.0), justification));
        }
    }
    for word in text.split_whitespace() {
        if let Ok(n) = word
            .trim_matches(|c: char| !c.is_ascii_digit() && c != '.')
            .parse::<f64>()
        {
            if (1.0..=5.0).contains(&n) {
                return Some((n, Some(text.to_string())));
            }
        }
    }
    None
}
