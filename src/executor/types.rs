// Data types for the executor module

use serde::{Deserialize, Serialize};

/// Output from a tool execution. The uniform result contract: side effects
/// happen inside tool execution, never in the result itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The text content from execution
    pub content: String,
    /// Whether the execution resulted in an error
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Per-invocation context passed from the agent loop into a tool.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Iteration index of the calling loop, 1-based.
    pub iteration: u32,
}

/// Truncate text to a byte cap on a char boundary, appending a marker when
/// anything was cut.
pub fn truncate_output(content: &str, cap: usize) -> String {
    if content.len() <= cap {
        return content.to_string();
    }
    let mut end = cap;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... [truncated]", &content[..end])
}
