use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{config::DEFAULT_PROVIDER_TIMEOUT_SECS, AnvylError, AnvylResult};

use super::{ChatMessage, ChatProvider};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Chat-completions client for any OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl OpenAiChatClient {
    /// Creates a client against the provider's base URL (the segment before
    /// `/chat/completions`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Asks the provider which models it serves; used by `/info` to report
    /// the model actually loaded. Falls back to `None` on any failure.
    pub async fn first_available_model(&self) -> Option<String> {
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .ok()?;

        let body: Value = response.json().await.ok()?;
        body.get("data")?
            .as_array()?
            .first()?
            .get("id")?
            .as_str()
            .map(String::from)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ChatProvider for OpenAiChatClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> AnvylResult<ChatMessage> {
        let mut body = json!({
            "model": model,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.to_vec());
            body["tool_choice"] = json!("auto");
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    AnvylError::ProviderUnavailable("provider request timed out".to_string())
                } else {
                    AnvylError::ProviderUnavailable(format!("provider unreachable: {}", error))
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AnvylError::ProviderUnavailable(format!(
                "provider returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(AnvylError::Validation(format!(
                "provider rejected the request with {}",
                status
            )));
        }

        let completion: ChatCompletionsResponse = response.json().await.map_err(|error| {
            AnvylError::ProviderUnavailable(format!("provider returned malformed JSON: {}", error))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| {
                AnvylError::ProviderUnavailable("provider returned no choices".to_string())
            })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_response_parsing() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_containers", "arguments": "{\"all\": true}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;

        let parsed: ChatCompletionsResponse = serde_json::from_str(body).unwrap();
        let message = &parsed.choices[0].message;
        assert_eq!(message.role, "assistant");
        assert!(message.content.is_none());
        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "list_containers");
    }

    #[test]
    fn test_final_reply_parsing() {
        let body = r#"{
            "choices": [{
                "message": {"role": "assistant", "content": "There are 2 containers."},
                "finish_reason": "stop"
            }]
        }"#;

        let parsed: ChatCompletionsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("There are 2 containers.")
        );
    }
}
