//! Answer model providers and the grounding prompt.

use crate::config::AnswerConfig;
use crate::error::AnswerError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Sentinel phrase the model is instructed to reply with when it cannot
/// answer from the supplied article.
pub const DECLINE_PHRASE: &str = "Unknown.";

/// Trait for answer models: one prompt in, one completion out.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Produce a single free-text completion for `prompt`. The returned
    /// string may be empty; normalization is the pipeline's concern.
    async fn complete(&self, prompt: &str) -> Result<String, AnswerError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// Build the grounding prompt: instruct the model to decline with the
/// fixed sentinel phrase, embed the full article verbatim as the only
/// evidence, then append the user's question.
pub fn build_grounding_prompt(domain: &str, article: &str, question: &str) -> String {
    format!(
        "I am a highly intelligent question answering bot. If you ask me a question \
         that is nonsense, trickery, unrelated to {domain}, or has no clear answer, \
         I will respond with \"{DECLINE_PHRASE}\". If you ask me a question about \
         {domain}, I will give you the answer based on the following help article:\n\n\
         {article}\n\n\
         Q: {question}\n\
         A:"
    )
}

/// OpenAI completions API answer provider.
///
/// Deterministic-leaning sampling: low temperature, no repetition
/// penalties, bounded output length, exactly one candidate.
pub struct OpenAiAnswerProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    top_p: f64,
    max_tokens: usize,
}

impl OpenAiAnswerProvider {
    /// Create a new provider from configuration.
    pub fn new(config: &AnswerConfig) -> Result<Self, AnswerError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| AnswerError::AuthFailed {
            provider: format!("openai: env var '{}' not set", config.api_key_env),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnswerError::Unavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        })
    }

    /// Parse a completions response body, returning `choices[0].text`.
    fn parse_response(body: &Value) -> Result<String, AnswerError> {
        let text = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| AnswerError::ResponseParse {
                message: "no choices in response".into(),
            })?;
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl AnswerProvider for OpenAiAnswerProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AnswerError> {
        let url = format!("{}/v1/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "temperature": self.temperature,
            "top_p": self.top_p,
            "frequency_penalty": 0,
            "presence_penalty": 0,
            "max_tokens": self.max_tokens,
            "n": 1,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnswerError::Unavailable {
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(AnswerError::Unavailable {
                message: format!("completion request failed ({status}): {body}"),
            });
        }

        let payload: Value = resp.json().await.map_err(|e| AnswerError::ResponseParse {
            message: e.to_string(),
        })?;
        Self::parse_response(&payload)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Create an answer provider based on configuration.
pub fn create_answer_provider(
    config: &AnswerConfig,
) -> Result<Arc<dyn AnswerProvider>, AnswerError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiAnswerProvider::new(config)?)),
        other => Err(AnswerError::Unavailable {
            message: format!("unknown answer provider '{other}'"),
        }),
    }
}
