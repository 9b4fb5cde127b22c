//! Chat-completions client for hosted model serving endpoints.
//!
//! Both the chatbot under evaluation and the LLM judge are served behind
//! the same wire shape: `{"messages": [{role, content}]}` in,
//! `choices[0].message.content` out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gavel_core::error::{GavelError, InferenceError, Result};
use gavel_core::message::{Message, UsageMetadata};
use gavel_core::model::{CallOptions, ChatModel, ChatResult};
use gavel_core::secret::SecretStore;

// ---------------------------------------------------------------------------
// Serving endpoint request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct EndpointRequest {
    pub messages: Vec<EndpointMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct EndpointMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct EndpointResponse {
    pub choices: Vec<EndpointChoice>,
    pub usage: Option<EndpointUsage>,
}

#[derive(Debug, Deserialize)]
pub struct EndpointChoice {
    pub message: EndpointResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct EndpointResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EndpointUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub struct EndpointError {
    pub message: String,
}

// ---------------------------------------------------------------------------
// ServingEndpoint
// ---------------------------------------------------------------------------

/// A [`ChatModel`] backed by a hosted serving endpoint.
pub struct ServingEndpoint {
    url: String,
    token: String,
    endpoint_name: String,
    client: reqwest::Client,
}

impl ServingEndpoint {
    /// `url` is the full invocation URL of the endpoint; `token` a bearer
    /// token, typically fetched through a
    /// [`SecretStore`](gavel_core::secret::SecretStore).
    pub fn new(url: impl Into<String>, token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            endpoint_name: name.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Construct with the bearer token resolved through a secret store.
    pub async fn from_secret_store(
        url: impl Into<String>,
        name: impl Into<String>,
        secrets: &dyn SecretStore,
        scope: &str,
        key: &str,
    ) -> Result<Self> {
        let token = secrets.get_secret(scope, key).await?;
        Ok(Self::new(url, token, name))
    }

    pub fn build_request(&self, messages: &[Message], options: &CallOptions) -> EndpointRequest {
        let api_messages = messages
            .iter()
            .map(|msg| EndpointMessage {
                role: match msg {
                    Message::System { .. } => "system".into(),
                    Message::User { .. } => "user".into(),
                    Message::Assistant { .. } => "assistant".into(),
                },
                content: msg.content().to_string(),
            })
            .collect();

        EndpointRequest {
            messages: api_messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stop: if options.stop.is_empty() {
                None
            } else {
                Some(options.stop.clone())
            },
        }
    }
}

#[async_trait]
impl ChatModel for ServingEndpoint {
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult> {
        let request_body = self.build_request(messages, options);

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GavelError::Inference(InferenceError::Request(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read response body".into());
            let error_msg = serde_json::from_str::<EndpointError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(GavelError::Inference(match status.as_u16() {
                401 | 403 => InferenceError::Auth(error_msg),
                429 => InferenceError::RateLimited {
                    retry_after_secs: None,
                },
                _ => InferenceError::Request(format!("HTTP {status}: {error_msg}")),
            }));
        }

        let api_response: EndpointResponse = response
            .json()
            .await
            .map_err(|e| GavelError::Inference(InferenceError::InvalidResponse(e.to_string())))?;

        let text = api_response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| {
                GavelError::Inference(InferenceError::InvalidResponse(
                    "response contained no choices".into(),
                ))
            })?;

        let usage = api_response.usage.map(|u| UsageMetadata {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatResult {
            message: Message::assistant(text),
            usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.endpoint_name
    }
}
