//! Core data models for round-trip translation

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Default source language for HTTP requests
pub const DEFAULT_SOURCE_LANG: &str = "hu";

/// Default target language for HTTP requests
pub const DEFAULT_TARGET_LANG: &str = "en";

/// Default completion model
pub const DEFAULT_MODEL: &str = "qwen/qwen3-235b-a22b-2507";

/// Sentinel the comparator returns when meanings match
pub const SAME_SENTINEL: &str = "SAME";

/// Closing instruction of the comparison message; asks for [`SAME_SENTINEL`]
pub const SAME_INSTRUCTION: &str = "If the two texts have the same meaning, answer with exactly SAME and nothing else. \
     Otherwise, concisely describe the differences in meaning.";

/// Chat message role. Only system messages are ever sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
}

/// One chat message in a completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Body of a chat-completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
}

/// Body of a chat-completion response; only `choices[].message.content` is read
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatReply,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    /// Some providers send `null` here (for example on refusals)
    pub content: Option<String>,
}

/// Round-trip translation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub model: String,
}

impl RoundTripRequest {
    /// New request with the HTTP defaults (`hu` -> `en`, default model)
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: DEFAULT_SOURCE_LANG.to_string(),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_lang = source.into();
        self.target_lang = target.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Outcome of a full round trip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub translated: String,
    pub back_translated: String,
    pub review: String,
}

impl PipelineResult {
    /// Whether the comparator reported matching meanings
    pub fn is_same(&self) -> bool {
        self.review.trim() == SAME_SENTINEL
    }
}

/// A completed pipeline stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Translated(String),
    BackTranslated(String),
    Review(String),
    Complete,
}

impl Stage {
    /// Event name used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Translated(_) => "translated",
            Stage::BackTranslated(_) => "back_translated",
            Stage::Review(_) => "review",
            Stage::Complete => "complete",
        }
    }

    /// JSON payload carrying this stage's single field
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Stage::Translated(text) => json!({ "translated": text }),
            Stage::BackTranslated(text) => json!({ "back_translated": text }),
            Stage::Review(text) => json!({ "review": text }),
            Stage::Complete => json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = RoundTripRequest::new("Szia");
        assert_eq!(request.source_lang, "hu");
        assert_eq!(request.target_lang, "en");
        assert_eq!(request.model, DEFAULT_MODEL);

        let request = request.with_languages("en", "af").with_model("m");
        assert_eq!(request.source_lang, "en");
        assert_eq!(request.target_lang, "af");
        assert_eq!(request.model, "m");
    }

    #[test]
    fn test_chat_request_shape() {
        let messages = vec![ChatMessage::system("hello")];
        let body = serde_json::to_value(ChatRequest {
            model: "m",
            messages: &messages,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({ "model": "m", "messages": [{ "role": "system", "content": "hello" }] })
        );
    }

    #[test]
    fn test_chat_response_ignores_extra_fields() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hi"},"finish_reason":"stop"}],"usage":{}}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_chat_response_null_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn test_same_instruction_names_sentinel() {
        assert!(SAME_INSTRUCTION.contains(&format!("exactly {} and nothing else", SAME_SENTINEL)));
        assert!(SAME_INSTRUCTION.contains("Otherwise, concisely"));
    }

    #[test]
    fn test_stage_payloads() {
        assert_eq!(Stage::Review("SAME".into()).name(), "review");
        assert_eq!(
            Stage::BackTranslated("x".into()).payload(),
            json!({ "back_translated": "x" })
        );
        assert_eq!(Stage::Complete.payload(), json!({}));
    }

    #[test]
    fn test_is_same() {
        let result = PipelineResult {
            translated: "Hello".into(),
            back_translated: "Szia".into(),
            review: "SAME\n".into(),
        };
        assert!(result.is_same());
    }
}
