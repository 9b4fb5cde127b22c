use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable configuration for one evaluation run.
///
/// Built once, passed by reference into each workflow component.
/// Components never read process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Human-readable run name, recorded in the run snapshot.
    pub run_name: String,

    /// Table reference the evaluation dataset is loaded from.
    pub dataset_table: String,

    /// Registered name of the model under evaluation.
    pub model_name: String,

    /// Judge decoding temperature. 0.0 keeps the judge deterministic.
    pub judge_temperature: f64,

    /// Upper bound on in-flight prediction calls. The inference endpoint
    /// is rate limited; this is the client-side cap.
    pub max_concurrent_predictions: usize,

    /// Unique identifier for this run.
    pub run_id: Uuid,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            run_name: "evaluation".into(),
            dataset_table: String::new(),
            model_name: String::new(),
            judge_temperature: 0.0,
            max_concurrent_predictions: 4,
            run_id: Uuid::new_v4(),
        }
    }
}

impl EvalConfig {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
            ..Self::default()
        }
    }

    pub fn with_dataset_table(mut self, table: impl Into<String>) -> Self {
        self.dataset_table = table.into();
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_judge_temperature(mut self, temperature: f64) -> Self {
        self.judge_temperature = temperature;
        self
    }

    pub fn with_max_concurrent_predictions(mut self, n: usize) -> Self {
        self.max_concurrent_predictions = n.max(1);
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EvalConfig::default();
        assert_eq!(config.run_name, "evaluation");
        assert_eq!(config.judge_temperature, 0.0);
        assert_eq!(config.max_concurrent_predictions, 4);
    }

    #[test]
    fn builder_methods() {
        let config = EvalConfig::new("solar-rag")
            .with_dataset_table("main.asset_nav.pdf_evaluation_clean")
            .with_model_name("asset_nav_chatbot")
            .with_max_concurrent_predictions(8);

        assert_eq!(config.run_name, "solar-rag");
        assert_eq!(config.dataset_table, "main.asset_nav.pdf_evaluation_clean");
        assert_eq!(config.model_name, "asset_nav_chatbot");
        assert_eq!(config.max_concurrent_predictions, 8);
    }

    #[test]
    fn concurrency_floor_is_one() {
        let config = EvalConfig::default().with_max_concurrent_predictions(0);
        assert_eq!(config.max_concurrent_predictions, 1);
    }

    #[test]
    fn run_id_uniqueness() {
        let a = EvalConfig::default();
        let b = EvalConfig::default();
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn serde_roundtrip() {
        let config = EvalConfig::new("roundtrip").with_model_name("m");
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EvalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_name, config.run_name);
        assert_eq!(parsed.model_name, config.model_name);
        assert_eq!(parsed.run_id, config.run_id);
    }
}
