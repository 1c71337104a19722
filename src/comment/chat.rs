//! Implements `CommentSource` with an OpenAI-compatible chat completion API.

use crate::comment::CommentSource;
use crate::config::CommentConfig;
use crate::error::{ErrorType, IntoResult, Res};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

const SYSTEM_PROMPT: &str = "あなたは熱血テニスコーチのように、全力で人を励ますアシスタントです。";
const USER_PROMPT: &str = "資産を増やそうと頑張っている人への応援コメントを80文字以内で一つください。";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Requests a comment from `{endpoint}/chat/completions`.
pub(crate) struct ChatComment {
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: Option<String>,
}

impl ChatComment {
    pub(crate) fn new(config: &CommentConfig, api_key: Option<&str>) -> Self {
        Self {
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            max_tokens: config.max_tokens(),
            api_key: api_key.map(str::to_string),
        }
    }

    fn request(&self) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: USER_PROMPT,
                },
            ],
            max_tokens: self.max_tokens,
        }
    }

    async fn fetch(&self) -> Res<String> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .context("No API key is available, set OPENAI_API_KEY")?;

        let url = format!("{}/chat/completions", self.endpoint);
        trace!("POST {url}");
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Unable to create HTTP client")?;
        let response: ChatResponse = client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request())
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()
            .context("The chat completion API returned an error status")?
            .json()
            .await
            .context("Unable to parse the chat completion response")?;

        response.first_content()
    }
}

#[async_trait::async_trait]
impl CommentSource for ChatComment {
    async fn comment(&self) -> Result<String> {
        self.fetch().await.pub_result(ErrorType::ExternalService)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn first_content(self) -> Res<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("The chat completion response has no content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;

    #[test]
    fn test_request_body() {
        let chat = ChatComment::new(&CommentConfig::default(), Some("sk-test"));
        let json = serde_json::to_value(chat.request()).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 50);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], USER_PROMPT);
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let config = CommentConfig {
            endpoint: "http://localhost:8080/v1/".to_string(),
            ..CommentConfig::default()
        };
        let chat = ChatComment::new(&config, None);
        assert_eq!(chat.endpoint, "http://localhost:8080/v1");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "今日も一歩前進だ！"}}]
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_content().unwrap(), "今日も一歩前進だ！");
    }

    #[test]
    fn test_response_without_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.first_content().is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_external_service_error() {
        let chat = ChatComment::new(&CommentConfig::default(), Some(""));
        let err = chat.comment().await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ExternalService);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_external_service_error() {
        let config = CommentConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..CommentConfig::default()
        };
        let chat = ChatComment::new(&config, Some("sk-test"));
        let err = chat.comment().await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ExternalService);
    }
}
