pub mod dataset;
pub mod judge;
pub mod metric;
pub mod predict;
pub mod promotion;
pub mod run;
pub mod runner;

pub mod prelude {
    pub use crate::dataset::{DatasetLoader, EvaluationRecord};
    pub use crate::judge::JudgeScorer;
    pub use crate::metric::{
        FewShotExample, MetricKind, MetricResult, RecordScore, SideMetrics, TOKEN_COUNT, TOXICITY,
    };
    pub use crate::predict::{PredictionBatch, PredictionFailure, PredictionGenerator};
    pub use crate::promotion::{PromotionDecision, PromotionGate, PromotionStatus};
    pub use crate::run::EvaluationRun;
    pub use crate::runner::EvaluationRunner;
}
