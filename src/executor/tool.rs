// Tool trait and shared helpers

use crate::executor::{Result, ToolContext, ToolOutput};
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use tracing::debug;

/// Name of the terminal tool. The agent loop intercepts it before dispatch;
/// it is registered only so the model sees its schema.
pub const DONE_TOOL: &str = "done";

/// Interface every tool conforms to. The dispatch table depends only on
/// this contract, never on concrete tool internals.
#[async_trait]
pub trait ToolImpl: Send + Sync {
    /// Get the tool definition (name, description, input_schema)
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with JSON input
    async fn run(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput>;

    /// Get tool name
    fn name(&self) -> String {
        self.definition().name
    }
}

/// Terminal signal the model invokes to finish a run.
pub struct DoneTool;

#[async_trait]
impl ToolImpl for DoneTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: DONE_TOOL.to_string(),
            description: "Signal that the task is complete. Call this exactly once, with a \
                          summary of the outcome, when nothing is left to do."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "Final response text for the user"
                    }
                },
                "required": ["summary"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        // Normally intercepted by the loop; answering directly keeps the
        // one-call-one-result invariant if it is ever dispatched.
        let summary = input
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Ok(ToolOutput::success(summary))
    }
}

/// Load tool description overrides from a TOML config file
pub fn load_tool_descriptions(
    path: &std::path::Path,
) -> Result<std::collections::HashMap<String, String>> {
    use std::collections::HashMap;

    if !path.exists() {
        debug!(path = %path.display(), "tools.toml not found, using default descriptions");
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path)?;
    // A whole TOML document, so `toml::Table`; `toml::Value::from_str`
    // only accepts a single value.
    let table: toml::Table = content.parse()?;

    let mut descriptions = HashMap::new();
    for (key, value) in &table {
        if let Some(desc) = value.get("description").and_then(|d| d.as_str()) {
            descriptions.insert(key.clone(), desc.to_string());
        }
    }

    debug!(path = %path.display(), tool_count = descriptions.len(), "loaded tool descriptions");
    Ok(descriptions)
}
