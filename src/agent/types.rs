// Agent types

use crate::provider::Usage;
use serde_json::Value;

/// Internal tool call representation, produced once per model tool-use
/// block and consumed exactly once by the loop.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Final outcome of one agent run, top-level or child.
#[derive(Debug, Clone)]
pub struct AgentRunOutput {
    /// Final response text
    pub text: String,
    /// Iterations consumed
    pub iterations: u32,
    /// Accumulated token usage across all inference calls, when reported
    pub usage: Option<Usage>,
}

/// Agent loop configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Iteration budget for the top-level orchestrator loop
    pub max_iterations: u32,
    /// Iteration budget for delegated child loops
    pub child_max_iterations: u32,
    /// Orchestrator system prompt
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            child_max_iterations: 15,
            system_prompt: "You are Coqui, a terminal assistant working inside a project \
                            workspace. Use the available tools to act: inspect and edit files, \
                            run commands, execute code, manage packages. Delegate focused \
                            sub-tasks to specialist agents with spawn_agent when useful. When \
                            the task is finished, call the done tool exactly once with a \
                            summary of the outcome. Never claim work you did not do."
                .to_string(),
        }
    }
}
