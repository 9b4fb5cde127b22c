use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gavel_core::error::Result;

/// The judge-scored metrics. Scores are on a 1-5 band scale, higher is
/// better (except toxicity, which is a side metric and not judge-scored).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    AnswerCorrectness,
    AnswerRelevance,
    Faithfulness,
    Professionalism,
}

impl MetricKind {
    pub const fn all() -> [MetricKind; 4] {
        [
            MetricKind::AnswerCorrectness,
            MetricKind::AnswerRelevance,
            MetricKind::Faithfulness,
            MetricKind::Professionalism,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::AnswerCorrectness => "answer_correctness",
            MetricKind::AnswerRelevance => "answer_relevance",
            MetricKind::Faithfulness => "faithfulness",
            MetricKind::Professionalism => "professionalism",
        }
    }

    /// Whether scoring compares against the expected answer.
    pub fn requires_ground_truth(&self) -> bool {
        matches!(self, MetricKind::AnswerCorrectness)
    }

    /// Whether scoring compares against the retrieved context.
    pub fn requires_context(&self) -> bool {
        matches!(self, MetricKind::Faithfulness)
    }

    /// What the metric measures, shown to the judge before the rubric.
    pub fn definition(&self) -> &'static str {
        match self {
            MetricKind::AnswerCorrectness => {
                "Answer correctness measures the factual accuracy of the provided \
                 output with respect to the ground-truth answer."
            }
            MetricKind::AnswerRelevance => {
                "Answer relevance measures the appropriateness and applicability of \
                 the output with respect to the question asked."
            }
            MetricKind::Faithfulness => {
                "Faithfulness measures how factually consistent the output is with \
                 the supplied context. Claims not supported by the context lower \
                 the score."
            }
            MetricKind::Professionalism => {
                "Professionalism refers to the use of a formal, respectful, and \
                 appropriate style of communication that is tailored to the context \
                 and audience. It often involves avoiding overly casual language, \
                 slang, or colloquialisms, and instead using clear, concise, and \
                 respectful language."
            }
        }
    }

    /// Grading rubric describing the 1-5 score bands.
    pub fn rubric(&self) -> &'static str {
        match self {
            MetricKind::AnswerCorrectness => {
                "- Score 1: The output contradicts the ground truth or is entirely wrong.\n\
                 - Score 2: The output is mostly incorrect with isolated correct fragments.\n\
                 - Score 3: The output is partially correct but omits or distorts key facts.\n\
                 - Score 4: The output is correct with only minor inaccuracies or omissions.\n\
                 - Score 5: The output matches the ground truth in all factual respects."
            }
            MetricKind::AnswerRelevance => {
                "- Score 1: The output does not address the question at all.\n\
                 - Score 2: The output is mostly off-topic with a tangential connection.\n\
                 - Score 3: The output partially addresses the question.\n\
                 - Score 4: The output addresses the question with minor digressions.\n\
                 - Score 5: The output directly and completely addresses the question."
            }
            MetricKind::Faithfulness => {
                "- Score 1: The output is unsupported by or contradicts the context.\n\
                 - Score 2: The output is mostly unsupported by the context.\n\
                 - Score 3: The output mixes supported and unsupported claims.\n\
                 - Score 4: The output is supported by the context with minor extrapolation.\n\
                 - Score 5: Every claim in the output is grounded in the context."
            }
            MetricKind::Professionalism => {
                "- Score 1: Language is extremely casual, informal, and may include slang \
                 or colloquialisms. Not suitable for professional contexts.\n\
                 - Score 2: Language is casual but generally respectful and avoids strong \
                 informality or slang. Acceptable in some informal professional settings.\n\
                 - Score 3: Language is overall formal but still has casual words/phrases. \
                 Borderline for professional contexts.\n\
                 - Score 4: Language is balanced and avoids extreme informality or \
                 formality. Suitable for most professional contexts.\n\
                 - Score 5: Language is noticeably formal, respectful, and avoids casual \
                 elements. Appropriate for formal business or academic settings."
            }
        }
    }

    /// Labeled example anchoring the judge, for reference-free metrics.
    pub fn few_shot_example(&self) -> Option<FewShotExample> {
        match self {
            MetricKind::Professionalism => Some(FewShotExample {
                input: "What is an Inverter?",
                output: "Oh, dude, so, like, an inverter is this super cool thing in \
                         solar energy setups! It's basically this device that takes the \
                         direct current (DC) electricity generated by solar panels and \
                         flips it into alternating current (AC), which is what we use in \
                         our homes and stuff, you know?",
                score: 2,
                justification: "The response is written in a casual tone. It uses \
                                contractions, filler words such as 'like', and \
                                exclamation points, which make it sound less \
                                professional.",
            }),
            _ => None,
        }
    }
}

/// A worked example shown to the judge to calibrate a rubric.
#[derive(Debug, Clone, Serialize)]
pub struct FewShotExample {
    pub input: &'static str,
    pub output: &'static str,
    pub score: u8,
    pub justification: &'static str,
}

/// Side metrics with no rubric, delegated entirely to an external
/// evaluation capability.
#[async_trait]
pub trait SideMetrics: Send + Sync {
    /// Number of tokens in the model response.
    async fn token_count(&self, text: &str) -> Result<u64>;

    /// Toxicity probability of the model response, in [0, 1].
    async fn toxicity(&self, text: &str) -> Result<f64>;
}

pub const TOKEN_COUNT: &str = "token_count";
pub const TOXICITY: &str = "toxicity";

/// Score a judge (or side capability) gave one record for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordScore {
    pub record_id: i64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

/// Per-metric scores and their aggregation over one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric: String,
    pub scores: Vec<RecordScore>,
    /// Ids of records this metric could not be computed for
    /// (missing context, unparseable judge response).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<i64>,
    pub mean: f64,
    pub variance: f64,
}

impl MetricResult {
    /// Aggregate scores into mean and population variance. Skipped records
    /// are kept by id so they are counted, not silently dropped.
    pub fn aggregate(metric: impl Into<String>, scores: Vec<RecordScore>, skipped: Vec<i64>) -> Self {
        let n = scores.len() as f64;
        let (mean, variance) = if scores.is_empty() {
            (0.0, 0.0)
        } else {
            let mean = scores.iter().map(|s| s.value).sum::<f64>() / n;
            let variance = scores
                .iter()
                .map(|s| (s.value - mean).powi(2))
                .sum::<f64>()
                / n;
            (mean, variance)
        };
        Self {
            metric: metric.into(),
            scores,
            skipped,
            mean,
            variance,
        }
    }

    pub fn scored_record_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.scores.iter().map(|s| s.record_id)
    }
}
