// Data types for the provider module - aligned with the Messages API

use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
}

/// A single message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text {
                text: content.into(),
            }],
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text {
                text: content.into(),
            }],
        }
    }

    /// Tool results travel back to the model as user-role content blocks.
    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
                is_error: Some(is_error),
            }],
        }
    }
}

/// Content block types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content from model or user
    Text {
        #[serde(default)]
        text: String,
    },

    /// Tool use request from model
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    /// Tool result from user
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: Option<bool>,
    },

    /// Thinking content (reasoning)
    Thinking {
        #[serde(default)]
        thinking: String,
    },

    /// Unknown content block
    #[serde(other)]
    Other,
}

/// Stop reason from the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

impl Usage {
    /// Accumulate another response's usage into this one.
    pub fn absorb(&mut self, other: &Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }

    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Tool definition advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "input_schema")]
    pub input_schema: serde_json::Value,
}

/// Complete request to the inference backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub model: String,
    #[serde(default)]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(rename = "max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl MessageRequest {
    /// Build a request. The first message must carry the user role.
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        max_tokens: u32,
    ) -> Result<Self, &'static str> {
        if messages.is_empty() {
            return Err("messages cannot be empty");
        }
        if messages.first().map(|m| &m.role) != Some(&Role::User) {
            return Err("first message must have user role");
        }

        Ok(Self {
            model: model.into(),
            system: Some(system.into()),
            messages,
            tools: Some(tools),
            max_tokens,
            temperature: None,
        })
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Response from the inference backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    pub model: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "stop_reason", default)]
    pub stop_reason: Option<StopReason>,
    #[serde(default)]
    pub usage: Option<Usage>,
    /// Additional fields from the backend
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

impl MessageResponse {
    /// Concatenated text content across all text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| {
                if let ContentBlock::Text { text } = block {
                    Some(text.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_requires_user_first() {
        let err = MessageRequest::new("m", "s", vec![], vec![], 1024);
        assert!(err.is_err());

        let err = MessageRequest::new("m", "s", vec![Message::assistant_text("hi")], vec![], 1024);
        assert!(err.is_err());

        let ok = MessageRequest::new("m", "s", vec![Message::user_text("hi")], vec![], 1024);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_response_text_concatenation() {
        let response = MessageResponse {
            id: "r".into(),
            content: vec![
                ContentBlock::Text {
                    text: "Hello ".into(),
                },
                ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "fs".into(),
                    input: serde_json::json!({}),
                },
                ContentBlock::Text {
                    text: "World".into(),
                },
            ],
            model: "m".into(),
            role: Role::Assistant,
            stop_reason: Some(StopReason::EndTurn),
            usage: None,
            extra: Default::default(),
        };
        assert_eq!(response.text(), "Hello World");
    }

    #[test]
    fn test_usage_absorb() {
        let mut total = Usage::default();
        total.absorb(&Usage {
            input_tokens: 10,
            output_tokens: 5,
        });
        total.absorb(&Usage {
            input_tokens: 7,
            output_tokens: 3,
        });
        assert_eq!(total.input_tokens, 17);
        assert_eq!(total.output_tokens, 8);
        assert_eq!(total.total(), 25);
    }

    #[test]
    fn test_unknown_content_block_tolerated() {
        let json = r#"{"type": "server_tool_use", "whatever": 1}"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        assert!(matches!(block, ContentBlock::Other));
    }
}
