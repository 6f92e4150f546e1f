// Shell tool - command execution in the workspace

use crate::executor::types::truncate_output;
use crate::executor::{ExecutorError, Result, ToolContext, ToolOutput};
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

/// Shell metacharacters that defeat a first-token allowlist check.
const CHAIN_TOKENS: &[&str] = &[";", "&&", "||", "|", "`", "$(", ">", "<"];

#[derive(Debug, Deserialize)]
struct ShellInput {
    command: String,
}

/// Shell tool running `/bin/sh -c` with the workspace as working directory.
/// An allowlist restricts child agents to a safe command set; the
/// orchestrator's unrestricted instance relies on the policy gate instead.
pub struct ShellTool {
    workspace: PathBuf,
    allowlist: Option<Vec<String>>,
    max_output_bytes: usize,
    description: String,
}

impl ShellTool {
    pub fn new(
        workspace: impl Into<PathBuf>,
        allowlist: Option<Vec<String>>,
        max_output_bytes: usize,
        description: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            allowlist,
            max_output_bytes,
            description: description.into(),
        }
    }

    fn check_allowlist(&self, command: &str) -> std::result::Result<(), String> {
        let Some(allowlist) = &self.allowlist else {
            return Ok(());
        };

        for token in CHAIN_TOKENS {
            if command.contains(token) {
                return Err(format!(
                    "command chaining ('{}') is not permitted for this agent",
                    token
                ));
            }
        }

        let first = command.split_whitespace().next().unwrap_or_default();
        if allowlist.iter().any(|a| a == first) {
            Ok(())
        } else {
            Err(format!(
                "command '{}' is not in the allowed set: {}",
                first,
                allowlist.join(", ")
            ))
        }
    }
}

#[async_trait]
impl crate::executor::ToolImpl for ShellTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "shell".to_string(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute"
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let start = Instant::now();

        let ShellInput { command } = serde_json::from_value(input)
            .map_err(|e| ExecutorError::InvalidInput("shell".to_string(), e.to_string()))?;

        if let Err(msg) = self.check_allowlist(&command) {
            return Ok(ToolOutput::error(msg));
        }

        debug!(command = %command, "executing shell command");

        let output = Command::new("/bin/sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&self.workspace)
            .output()
            .await
            .map_err(|e| ExecutorError::SpawnFailed("shell".to_string(), e.to_string()))?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = truncate_output(&String::from_utf8_lossy(&output.stdout), self.max_output_bytes);
        let stderr = truncate_output(&String::from_utf8_lossy(&output.stderr), self.max_output_bytes);

        let mut content = String::new();
        if !stdout.is_empty() {
            content.push_str("[stdout]\n");
            content.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str("[stderr]\n");
            content.push_str(&stderr);
        }
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&format!("Exit code: {}", exit_code));

        let is_error = !output.status.success();

        info!(
            command = %command.chars().take(100).collect::<String>(),
            duration_ms = start.elapsed().as_millis() as u64,
            exit_code = exit_code,
            output_bytes = content.len(),
            is_error = is_error,
            "shell command executed"
        );

        Ok(ToolOutput {
            content,
            is_error,
        })
    }
}

/// Default shell tool description
pub fn default_shell_description(restricted: bool) -> String {
    if restricted {
        "Execute a command from the allowed set via /bin/sh -c, with the workspace \
         as working directory. Command chaining is not permitted."
            .to_string()
    } else {
        "Execute a shell command via /bin/sh -c with the workspace as working \
         directory. Stdout and stderr are captured; the exit code is returned."
            .to_string()
    }
}
