// spawn_agent tool - delegation to single-level child agents
//
// A child agent runs a full propose/execute loop of its own, with a
// role-scoped toolset and its own iteration budget, then reports back as
// an ordinary tool result. Delegation depth is bounded twice over: child
// dispatch tables never contain a spawn tool, and the tool itself refuses
// to run past MAX_DELEGATION_DEPTH even if one is ever wired in.

use crate::agent::{run_agent, AgentConfig, RunOptions};
use crate::executor::config::ExecutorConfig;
use crate::executor::runner::Executor;
use crate::executor::tool::ToolImpl;
use crate::executor::types::{ToolContext, ToolOutput};
use crate::executor::{ExecutorError, Result};
use crate::observer::Observer;
use crate::policy::NoGate;
use crate::provider::{Provider, RoleResolver, ToolDefinition};
use crate::session::{ChildRunRecord, SessionSink};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Maximum nesting of delegated runs. Depth 0 is the orchestrator.
pub const MAX_DELEGATION_DEPTH: u8 = 1;

pub struct SpawnAgentTool {
    provider: Provider,
    roles: RoleResolver,
    exec_config: ExecutorConfig,
    agent_config: AgentConfig,
    session: Option<Arc<dyn SessionSink>>,
    observer: Option<Arc<dyn Observer>>,
    description: String,
    /// Depth of the agent this tool belongs to; children run at depth + 1.
    depth: u8,
}

impl SpawnAgentTool {
    pub fn new(
        provider: Provider,
        roles: RoleResolver,
        exec_config: ExecutorConfig,
        agent_config: AgentConfig,
        session: Option<Arc<dyn SessionSink>>,
        observer: Option<Arc<dyn Observer>>,
        description: Option<String>,
    ) -> Self {
        Self {
            provider,
            roles,
            exec_config,
            agent_config,
            session,
            observer,
            description: description.unwrap_or_else(default_spawn_description),
            depth: 0,
        }
    }

    /// Rebind this tool to a deeper agent. `run` refuses once the resulting
    /// child depth would exceed [`MAX_DELEGATION_DEPTH`].
    pub fn at_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }
}

fn default_spawn_description() -> String {
    "Delegate a focused sub-task to a specialist child agent. The child works \
     autonomously with a reduced toolset and returns its final report. Roles: \
     'coder' (can read, write and run code in the workspace), 'reviewer' (read-only \
     inspection). Give the child a complete, self-contained task description; it \
     does not see this conversation."
        .to_string()
}

/// Child user prompt: the task, preceded by an optional context section.
fn child_prompt(task: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("## Context\n{}\n\n## Task\n{}", context, task),
        None => task.to_string(),
    }
}

/// System prompt for a delegated child, scoped to its role.
pub fn child_system_prompt(role: &str) -> String {
    let role_line = match role {
        "coder" => {
            "You are a coder agent. Implement exactly the task you were given: \
             inspect files, make edits and verify them with the commands available."
        }
        "reviewer" => {
            "You are a reviewer agent with read-only access. Inspect the relevant \
             files and report concrete findings; you cannot modify anything."
        }
        _ => {
            "You are a specialist agent with read-only access to the workspace. \
             Complete the task you were given and report your findings."
        }
    };
    format!(
        "{} Work only on the stated task. When it is finished, call the done tool \
         exactly once with your full report as the summary.",
        role_line
    )
}

#[async_trait]
impl ToolImpl for SpawnAgentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "spawn_agent".to_string(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "role": {
                        "type": "string",
                        "description": "Child role: 'coder', 'reviewer', or a custom label"
                    },
                    "task": {
                        "type": "string",
                        "description": "Complete, self-contained task description"
                    },
                    "context": {
                        "type": "string",
                        "description": "Optional background the child should know before starting"
                    }
                },
                "required": ["role", "task"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        if self.depth >= MAX_DELEGATION_DEPTH {
            warn!(depth = self.depth, "delegation depth limit reached");
            return Ok(ToolOutput::error(format!(
                "delegation depth limit ({}) reached; complete the task directly",
                MAX_DELEGATION_DEPTH
            )));
        }

        let role = input
            .get("role")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ExecutorError::InvalidInput("spawn_agent".into(), "'role' is required".into()))?
            .trim()
            .to_string();
        let task = input
            .get("task")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ExecutorError::InvalidInput("spawn_agent".into(), "'task' is required".into()))?
            .to_string();
        let context = input
            .get("context")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty());
        let prompt = child_prompt(&task, context);

        let model = self.roles.resolve(&role).to_string();
        info!(role = %role, model = %model, parent_iteration = ctx.iteration, "spawning child agent");
        if let Some(observer) = &self.observer {
            observer.on_child_start(&role, &model);
        }

        let brain = self.provider.with_model(&model);
        let executor = Executor::for_role(&role, &self.exec_config)?;
        let system = child_system_prompt(&role);
        let mut messages = Vec::new();

        // Children run ungated: the user approved the delegation itself at
        // the parent's gate, and child toolsets are already restricted.
        let run = run_agent(
            &brain,
            &executor,
            &NoGate,
            &mut messages,
            &prompt,
            RunOptions {
                system: &system,
                max_iterations: self.agent_config.child_max_iterations,
                session: None,
                observer: None,
            },
        )
        .await;

        let (output, result_text, tokens) = match run {
            Ok(out) => {
                let tokens = out.usage.as_ref().map(|u| u.total()).unwrap_or(0);
                let content = format!("Child agent ({}) finished:\n{}", role, out.text);
                (ToolOutput::success(content), out.text, tokens)
            }
            Err(e) => {
                warn!(role = %role, error = %e, "child agent run failed");
                let msg = format!("Child agent ({}) failed: {}", role, e);
                (ToolOutput::error(msg.clone()), msg, 0)
            }
        };

        if let Some(observer) = &self.observer {
            observer.on_child_end(&role, output.is_error);
        }
        if let Some(session) = &self.session {
            session.log_child_run(ChildRunRecord::new(
                ctx.iteration,
                &role,
                &model,
                &prompt,
                &result_text,
                tokens,
            ));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_provider() -> Provider {
        Provider::new(crate::provider::ProviderConfig {
            endpoint: "http://localhost:0".to_string(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            max_retries: 0,
            base_retry_delay_ms: 1,
            request_timeout_secs: 1,
            max_output_tokens: 256,
            temperature: None,
        })
        .unwrap()
    }

    fn test_tool() -> SpawnAgentTool {
        SpawnAgentTool::new(
            test_provider(),
            RoleResolver::new("test-model"),
            ExecutorConfig::with_workspace(std::env::temp_dir()),
            AgentConfig::default(),
            None,
            None,
            None,
        )
    }

    #[tokio::test]
    async fn test_missing_role_rejected() {
        let tool = test_tool();
        let err = tool
            .run(json!({"task": "do something"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'role' is required"));
    }

    #[tokio::test]
    async fn test_missing_task_rejected() {
        let tool = test_tool();
        let err = tool
            .run(json!({"role": "coder"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'task' is required"));
    }

    #[tokio::test]
    async fn test_blank_role_rejected() {
        let tool = test_tool();
        let err = tool
            .run(json!({"role": "  ", "task": "x"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'role' is required"));
    }

    #[tokio::test]
    async fn test_depth_limit_refuses_without_validating() {
        let tool = test_tool().at_depth(MAX_DELEGATION_DEPTH);
        // Even a well-formed request is refused at the depth limit.
        let out = tool
            .run(json!({"role": "coder", "task": "x"}), &ToolContext::default())
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("delegation depth limit"));
    }

    #[test]
    fn test_child_prompt_sections() {
        assert_eq!(child_prompt("fix the bug", None), "fix the bug");
        let with_context = child_prompt("fix the bug", Some("the bug is in App.php"));
        assert_eq!(
            with_context,
            "## Context\nthe bug is in App.php\n\n## Task\nfix the bug"
        );
    }

    #[test]
    fn test_child_prompts_mention_done() {
        for role in ["coder", "reviewer", "tester"] {
            assert!(child_system_prompt(role).contains("done tool"));
        }
        assert!(child_system_prompt("reviewer").contains("read-only"));
    }
}
