use gavel_core::config::EvalConfig;
use gavel_core::error::Result;

use crate::dataset::DatasetLoader;
use crate::judge::JudgeScorer;
use crate::predict::PredictionGenerator;
use crate::run::EvaluationRun;

/// Sequences the three workflow stages: load, predict, score.
///
/// Stages run strictly in order; a record is only scored once its
/// prediction completed. Which stage a failed run died in is carried by
/// the error variant (`Dataset`, `Inference`, `Judge`).
pub struct EvaluationRunner {
    loader: DatasetLoader,
    generator: PredictionGenerator,
    scorer: JudgeScorer,
    config: EvalConfig,
}

impl EvaluationRunner {
    pub fn new(
        loader: DatasetLoader,
        generator: PredictionGenerator,
        scorer: JudgeScorer,
        config: EvalConfig,
    ) -> Self {
        // The config owns the prediction cap; whatever the generator was
        // built with is overridden here.
        let generator = generator.with_max_concurrent(config.max_concurrent_predictions);
        Self {
            loader,
            generator,
            scorer,
            config,
        }
    }

    /// Execute one full evaluation and return its immutable snapshot.
    pub async fn run(&self) -> Result<EvaluationRun> {
        tracing::info!(
            run_name = %self.config.run_name,
            model = %self.config.model_name,
            table = %self.config.dataset_table,
            "loading evaluation dataset"
        );
        let records = self.loader.load(&self.config.dataset_table).await?;
        tracing::info!(records = records.len(), "dataset loaded");

        let batch = self.generator.predict(records).await;
        if !batch.is_fully_predicted() {
            tracing::warn!(
                failed = batch.failures.len(),
                predicted = batch.records.len(),
                "prediction stage completed with failures"
            );
        }

        let run = self
            .scorer
            .score(batch.records, &self.config, batch.failures.len())
            .await?;
        tracing::info!(run_id = %run.run_id, complete = run.is_complete(), "scoring finished");
        Ok(run)
    }
}
