//! Full workflow scenario: load a three-row dataset, predict with a
//! registered chatbot, score with a deterministic judge, then promote the
//! evaluated version through the manual gate.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use gavel_core::config::EvalConfig;
use gavel_core::error::Result;
use gavel_core::message::Message;
use gavel_core::model::{CallOptions, ChatModel, ChatResult};
use gavel_core::registry::{InMemoryRegistry, ModelReference, ModelRegistry};
use gavel_core::table::JsonTableSource;
use gavel_eval::prelude::*;

struct Chatbot;

#[async_trait]
impl ChatModel for Chatbot {
    async fn generate(&self, messages: &[Message], _options: &CallOptions) -> Result<ChatResult> {
        let question = messages.last().map(Message::content).unwrap_or_default();
        let answer = if question.contains("inverter") {
            "An inverter converts DC electricity from solar panels into AC electricity."
        } else {
            "A combiner box joins several PV strings into one output circuit."
        };
        Ok(ChatResult {
            message: Message::assistant(answer),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        "solar-chatbot"
    }
}

/// Judge that grades correctness high and everything else mid-band.
struct Judge;

#[async_trait]
impl ChatModel for Judge {
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult> {
        // The scorer pins the judge to deterministic decoding.
        assert_eq!(options.temperature, Some(0.0));
        let prompt = messages.last().map(Message::content).unwrap_or_default();
        let response = if prompt.contains("Ground truth answer") {
            r#"{"score": 5, "justification": "matches the ground truth"}"#
        } else {
            r#"{"score": 4, "justification": "solid"}"#
        };
        Ok(ChatResult {
            message: Message::assistant(response),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        "judge"
    }
}

fn evaluation_table() -> Arc<JsonTableSource> {
    Arc::new(JsonTableSource::new().with_table(
        "main.asset_nav.pdf_evaluation_clean",
        vec![
            json!({"id": 1, "question": "What is an inverter?",
                   "expected_answer": "A device converting DC to AC",
                   "context": "Inverters convert DC to AC for home use"}),
            json!({"id": 2, "question": "What is a charge controller?",
                   "expected_answer": null,
                   "context": "Charge controllers regulate battery charging"}),
            json!({"id": 3, "question": "What is a combiner box?",
                   "expected_answer": "An enclosure joining PV strings",
                   "context": null}),
        ],
    ))
}

async fn evaluate() -> EvaluationRun {
    let config = EvalConfig::new("solar-rag-eval")
        .with_dataset_table("main.asset_nav.pdf_evaluation_clean")
        .with_model_name("solar-chatbot");

    let runner = EvaluationRunner::new(
        DatasetLoader::new(evaluation_table()),
        PredictionGenerator::new(Arc::new(Chatbot)),
        JudgeScorer::new(Arc::new(Judge)),
        config,
    );
    runner.run().await.unwrap()
}

#[tokio::test]
async fn load_excludes_rows_without_ground_truth() {
    let run = evaluate().await;
    let ids: Vec<i64> = run.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(run.model_name, "solar-chatbot");
}

#[tokio::test]
async fn missing_context_excludes_faithfulness_only() {
    let run = evaluate().await;

    let faithfulness = run.metric("faithfulness").unwrap();
    assert_eq!(faithfulness.scored_record_ids().collect::<Vec<_>>(), vec![1]);
    assert_eq!(faithfulness.skipped, vec![3]);

    // Record 3 is still scored by the reference- and question-based metrics.
    for name in ["answer_correctness", "answer_relevance", "professionalism"] {
        let metric = run.metric(name).unwrap();
        assert!(metric.scored_record_ids().any(|id| id == 3), "{name} missed record 3");
    }
    assert!(!run.is_complete());
}

#[tokio::test]
async fn aggregates_reflect_judge_scores() {
    let run = evaluate().await;
    assert_eq!(run.mean("answer_correctness"), Some(5.0));
    assert_eq!(run.mean("answer_relevance"), Some(4.0));
    assert_eq!(run.metric("answer_correctness").unwrap().variance, 0.0);
    assert_eq!(run.prediction_failures, 0);
}

#[tokio::test]
async fn promotion_assigns_and_reassigns_alias() {
    let registry = Arc::new(InMemoryRegistry::new());
    let v1 = registry.register("solar-chatbot", Arc::new(Chatbot)).await;
    let v2 = registry.register("solar-chatbot", Arc::new(Chatbot)).await;
    assert_eq!(registry.latest_version("solar-chatbot").await.unwrap(), v2);

    let run = evaluate().await;
    let gate = PromotionGate::new(registry.clone(), "prod");

    // Operator inspects the aggregates, then promotes v1.
    let decision = gate
        .promote(&run, &ModelReference::new("solar-chatbot", v1))
        .await
        .unwrap();
    assert_eq!(
        decision.status,
        PromotionStatus::Promoted { alias: "prod".into() }
    );
    assert_eq!(
        registry.alias_version("solar-chatbot", "prod").await.unwrap(),
        Some(v1)
    );

    // A later evaluation moves the alias; the previous binding is dropped.
    gate.promote(&run, &ModelReference::new("solar-chatbot", v2))
        .await
        .unwrap();
    assert_eq!(
        registry.alias_version("solar-chatbot", "prod").await.unwrap(),
        Some(v2)
    );
}

#[tokio::test]
async fn registry_loaded_model_answers_predictions() {
    let registry = Arc::new(InMemoryRegistry::new());
    let version = registry.register("solar-chatbot", Arc::new(Chatbot)).await;
    let model = registry.load_model("solar-chatbot", version).await.unwrap();

    let generator = PredictionGenerator::new(model);
    let batch = generator
        .predict(vec![EvaluationRecord::new(
            1,
            "What is an inverter?",
            "A device converting DC to AC",
        )])
        .await;

    assert!(batch.is_fully_predicted());
    assert!(batch.records[0]
        .predicted_answer
        .as_deref()
        .unwrap()
        .contains("AC electricity"));
}
