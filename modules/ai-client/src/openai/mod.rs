mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::{Completion, Message};
use client::{OpenAiClient, OPENAI_API_URL};
use types::ChatRequest;

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    json_mode: bool,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            temperature: 0.5,
            max_tokens: 1200,
            timeout: Duration::from_secs(30),
            json_mode: false,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the provider to return a single JSON object.
    pub fn json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    fn client(&self) -> Result<OpenAiClient> {
        OpenAiClient::new(
            &self.api_key,
            self.base_url.as_deref().unwrap_or(OPENAI_API_URL),
            self.timeout,
        )
    }

    fn request(&self, messages: &[Message]) -> ChatRequest {
        let request = ChatRequest::new(&self.model)
            .messages(messages)
            .token_limit(self.max_tokens)
            .temperature(self.temperature);
        if self.json_mode {
            request.json_mode()
        } else {
            request
        }
    }

    /// Simple system + user chat completion.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        self.complete(&[Message::system(system), Message::user(user)])
            .await
    }
}

#[async_trait]
impl Completion for OpenAi {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = self.request(messages);
        self.client()?.chat(&request).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;

    #[test]
    fn builder_defaults() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini");
        assert_eq!(ai.model, "gpt-4o-mini");
        assert_eq!(ai.base_url, None);
        assert!(!ai.json_mode);
        assert_eq!(ai.timeout, Duration::from_secs(30));
    }

    #[test]
    fn request_carries_configured_options() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini")
            .with_temperature(0.2)
            .with_max_tokens(300)
            .json_mode();
        let request = ai.request(&[Message::user("score this")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["response_format"]["type"], "json_object");
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unreachable_base_url_is_a_network_error() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_millis(500));
        let err = ai.chat_completion("sys", "user").await.unwrap_err();
        assert!(matches!(err, AiError::Network(_)), "got {err:?}");
    }
}
