use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gavel_core::error::Result;
use gavel_core::registry::{ModelReference, ModelRegistry};

use crate::run::EvaluationRun;

/// Promotion state of a model version under evaluation.
///
/// `Promoted` is re-enterable rather than terminal: the alias primitive
/// is last-writer-wins, so a later run can move it to another version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PromotionStatus {
    Pending,
    Promoted { alias: String },
}

/// Record of one promotion decision against one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionDecision {
    pub model: ModelReference,
    pub run_id: uuid::Uuid,
    pub status: PromotionStatus,
    pub decided_at: DateTime<Utc>,
}

/// The manual gate between a scored run and a live alias.
///
/// Inspecting the aggregates and deciding to promote is an explicit
/// operator action; no threshold policy lives here.
pub struct PromotionGate {
    registry: Arc<dyn ModelRegistry>,
    alias: String,
}

impl PromotionGate {
    pub fn new(registry: Arc<dyn ModelRegistry>, alias: impl Into<String>) -> Self {
        Self {
            registry,
            alias: alias.into(),
        }
    }

    /// Assign the gate's alias to `model`, recording the run the decision
    /// was made against. A single atomic registry call; concurrent
    /// promotions resolve last-writer-wins.
    pub async fn promote(
        &self,
        run: &EvaluationRun,
        model: &ModelReference,
    ) -> Result<PromotionDecision> {
        self.registry
            .set_alias(&model.name, &self.alias, model.version)
            .await?;
        tracing::info!(
            model = %model.name,
            version = model.version,
            alias = %self.alias,
            run_id = %run.run_id,
            "model version promoted"
        );
        Ok(PromotionDecision {
            model: model.clone(),
            run_id: run.run_id,
            status: PromotionStatus::Promoted {
                alias: self.alias.clone(),
            },
            decided_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gavel_core::error::{GavelError, RegistryError};
    use gavel_core::message::Message;
    use gavel_core::model::{CallOptions, ChatModel, ChatResult};
    use gavel_core::registry::InMemoryRegistry;
    use uuid::Uuid;

    struct StubModel;

    #[async_trait]
    impl ChatModel for StubModel {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: &CallOptions,
        ) -> Result<ChatResult> {
            Ok(ChatResult {
                message: Message::assistant("stub"),
                usage: None,
            })
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn empty_run() -> EvaluationRun {
        EvaluationRun {
            run_id: Uuid::new_v4(),
            run_name: "promotion-test".into(),
            model_name: "chatbot".into(),
            created_at: Utc::now(),
            records: Vec::new(),
            metrics: Vec::new(),
            prediction_failures: 0,
        }
    }

    #[tokio::test]
    async fn promote_sets_alias() {
        let registry = Arc::new(InMemoryRegistry::new());
        let version = registry.register("chatbot", Arc::new(StubModel)).await;

        let gate = PromotionGate::new(registry.clone(), "prod");
        let run = empty_run();
        let decision = gate
            .promote(&run, &ModelReference::new("chatbot", version))
            .await
            .unwrap();

        assert_eq!(
            decision.status,
            PromotionStatus::Promoted {
                alias: "prod".into()
            }
        );
        assert_eq!(decision.run_id, run.run_id);
        assert_eq!(
            registry.alias_version("chatbot", "prod").await.unwrap(),
            Some(version)
        );
    }

    #[tokio::test]
    async fn reassignment_is_last_writer_wins() {
        let registry = Arc::new(InMemoryRegistry::new());
        let v1 = registry.register("chatbot", Arc::new(StubModel)).await;
        let v2 = registry.register("chatbot", Arc::new(StubModel)).await;

        let gate = PromotionGate::new(registry.clone(), "prod");
        gate.promote(&empty_run(), &ModelReference::new("chatbot", v1))
            .await
            .unwrap();
        gate.promote(&empty_run(), &ModelReference::new("chatbot", v2))
            .await
            .unwrap();

        // The alias points at v2 only; v1's binding is gone.
        assert_eq!(
            registry.alias_version("chatbot", "prod").await.unwrap(),
            Some(v2)
        );
    }

    #[tokio::test]
    async fn promoting_unknown_version_fails() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.register("chatbot", Arc::new(StubModel)).await;

        let gate = PromotionGate::new(registry, "prod");
        let err = gate
            .promote(&empty_run(), &ModelReference::new("chatbot", 42))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GavelError::Registry(RegistryError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn status_serde() {
        let status = PromotionStatus::Promoted {
            alias: "prod".into(),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains(r#""state":"promoted"#));
        let pending: PromotionStatus = serde_json::from_str(r#"{"state":"pending"}"#).unwrap();
        assert_eq!(pending, PromotionStatus::Pending);
    }
}
