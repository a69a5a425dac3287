//! Client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Used for both the vision and the text role; the caller picks the model
//! and temperature per request. Works against Groq, OpenRouter and OpenAI.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ChatRole;
use crate::error::ProviderError;

const PROVIDER: &str = "chat";

/// Finish reason reported when the provider's moderation cut the reply.
const FINISH_REASON_CONTENT_FILTER: &str = "content_filter";
/// Error codes OpenAI-compatible providers use for moderation rejections.
const CONTENT_POLICY_CODES: &[&str] = &["content_policy_violation", "content_filter"];

/// HTTP client for one chat completions API.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    timeout: Duration,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl ChatCompletionsClient {
    /// Create a client reusing an existing [`reqwest::Client`].
    ///
    /// * `api_url` - Base URL, e.g. `https://api.groq.com/openai/v1`.
    /// * `timeout` - Reported in [`ProviderError::Timeout`] when the
    ///   underlying client times out.
    pub fn new(
        client: reqwest::Client,
        api_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    /// Ask `role`'s model about an image.
    pub async fn complete_with_image(
        &self,
        role: &ChatRole,
        instruction: &str,
        image_url: &str,
    ) -> Result<String, ProviderError> {
        let content = MessageContent::Parts(vec![
            ContentPart::Text { text: instruction },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: image_url },
            },
        ]);
        self.send(role, content).await
    }

    /// Complete a plain text prompt with `role`'s model.
    pub async fn complete(&self, role: &ChatRole, prompt: &str) -> Result<String, ProviderError> {
        self.send(role, MessageContent::Text(prompt)).await
    }

    async fn send(
        &self,
        role: &ChatRole,
        content: MessageContent<'_>,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &role.model,
            temperature: role.temperature,
            messages: [ChatMessage {
                role: "user",
                content,
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(status_error(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed {
                provider: PROVIDER,
                detail: e.to_string(),
            })?;

        first_choice_text(parsed)
    }
}

/// Map a non-success response, recognising moderation rejections reported
/// as a 400 with a content-policy error code.
fn status_error(status: u16, body: String) -> ProviderError {
    if status == 400 {
        if let Ok(ErrorEnvelope { error }) = serde_json::from_str::<ErrorEnvelope>(&body) {
            if error
                .code
                .as_deref()
                .is_some_and(|code| CONTENT_POLICY_CODES.contains(&code))
            {
                return ProviderError::ContentPolicy {
                    provider: PROVIDER,
                    detail: error
                        .message
                        .unwrap_or_else(|| "request rejected by content policy".to_string()),
                };
            }
        }
    }
    ProviderError::Status {
        provider: PROVIDER,
        status,
        body,
    }
}

/// Pull the reply text out of the first choice, surfacing moderation.
fn first_choice_text(response: ChatResponse) -> Result<String, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed {
            provider: PROVIDER,
            detail: "response has no choices".to_string(),
        })?;

    if let Some(refusal) = choice.message.refusal.filter(|r| !r.is_empty()) {
        return Err(ProviderError::ContentPolicy {
            provider: PROVIDER,
            detail: refusal,
        });
    }
    if choice.finish_reason.as_deref() == Some(FINISH_REASON_CONTENT_FILTER) {
        return Err(ProviderError::ContentPolicy {
            provider: PROVIDER,
            detail: "reply withheld by the provider's content filter".to_string(),
        });
    }

    choice.message.content.ok_or_else(|| ProviderError::Malformed {
        provider: PROVIDER,
        detail: "first choice has no message content".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn response(json: serde_json::Value) -> ChatResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn vision_request_serializes_as_content_parts() {
        let body = ChatRequest {
            model: "vision-model",
            temperature: 0.2,
            messages: [ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text { text: "describe" },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "https://img.example/room.jpg",
                        },
                    },
                ]),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        let parts = &json["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "https://img.example/room.jpg");
    }

    #[test]
    fn text_request_serializes_content_as_string() {
        let body = ChatRequest {
            model: "text-model",
            temperature: 0.7,
            messages: [ChatMessage {
                role: "user",
                content: MessageContent::Text("hello"),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["content"], "hello");
        assert_eq!(json["model"], "text-model");
    }

    #[test]
    fn first_choice_content_is_returned() {
        let parsed = response(serde_json::json!({
            "choices": [{"message": {"content": "hi"}, "finish_reason": "stop"}]
        }));
        assert_eq!(first_choice_text(parsed).unwrap(), "hi");
    }

    #[test]
    fn content_filter_is_a_policy_rejection() {
        let parsed = response(serde_json::json!({
            "choices": [{"message": {"content": null}, "finish_reason": "content_filter"}]
        }));
        assert_matches!(
            first_choice_text(parsed),
            Err(ProviderError::ContentPolicy { .. })
        );
    }

    #[test]
    fn refusal_is_a_policy_rejection() {
        let parsed = response(serde_json::json!({
            "choices": [{"message": {"content": null, "refusal": "I can't help"}}]
        }));
        assert_matches!(
            first_choice_text(parsed),
            Err(ProviderError::ContentPolicy { detail, .. }) if detail == "I can't help"
        );
    }

    #[test]
    fn content_policy_error_code_is_a_policy_rejection() {
        let body = r#"{"error":{"message":"Your request was rejected","type":"invalid_request_error","code":"content_policy_violation"}}"#;
        assert_matches!(
            status_error(400, body.to_string()),
            ProviderError::ContentPolicy { detail, .. } if detail == "Your request was rejected"
        );
    }

    #[test]
    fn other_bad_requests_keep_their_status() {
        let body = r#"{"error":{"message":"model not found","code":"model_not_found"}}"#;
        assert_matches!(
            status_error(400, body.to_string()),
            ProviderError::Status { status: 400, .. }
        );
        assert_matches!(
            status_error(400, "plain text".to_string()),
            ProviderError::Status { status: 400, .. }
        );
    }

    #[test]
    fn empty_choices_is_malformed() {
        let parsed = response(serde_json::json!({ "choices": [] }));
        assert_matches!(
            first_choice_text(parsed),
            Err(ProviderError::Malformed { .. })
        );
    }
}
