// Composer tool - package management via the composer binary

use crate::executor::types::truncate_output;
use crate::executor::{ExecutorError, Result, ToolContext, ToolOutput};
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Composer subcommands the tool will run. A closed set: anything else is
/// rejected before a process is spawned.
const ALLOWED_ACTIONS: &[&str] = &[
    "install", "update", "require", "remove", "show", "outdated", "validate",
];

/// Actions that operate on a specific package.
const PACKAGE_ACTIONS: &[&str] = &["require", "remove"];

#[derive(Debug, Deserialize)]
struct ComposerInput {
    action: String,
    #[serde(default)]
    package: Option<String>,
}

/// Composer package-management tool, confined to the workspace project.
pub struct ComposerTool {
    workspace: PathBuf,
    max_output_bytes: usize,
    description: String,
}

impl ComposerTool {
    pub fn new(
        workspace: impl Into<PathBuf>,
        max_output_bytes: usize,
        description: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            max_output_bytes,
            description: description.into(),
        }
    }
}

#[async_trait]
impl crate::executor::ToolImpl for ComposerTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "composer".to_string(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ALLOWED_ACTIONS,
                        "description": "Composer subcommand to run"
                    },
                    "package": {
                        "type": "string",
                        "description": "Package name, e.g. vendor/name, required for require/remove"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let ComposerInput { action, package } = serde_json::from_value(input)
            .map_err(|e| ExecutorError::InvalidInput("composer".to_string(), e.to_string()))?;

        if !ALLOWED_ACTIONS.contains(&action.as_str()) {
            return Ok(ToolOutput::error(format!(
                "composer action '{}' is not permitted; allowed: {}",
                action,
                ALLOWED_ACTIONS.join(", ")
            )));
        }

        let mut args = vec![action.clone()];
        if PACKAGE_ACTIONS.contains(&action.as_str()) {
            let Some(package) = package.as_deref().map(str::trim).filter(|p| !p.is_empty())
            else {
                return Err(ExecutorError::InvalidInput(
                    "composer".to_string(),
                    format!("'package' is required for {}", action),
                ));
            };
            // Package names never start with a dash; blocks flag smuggling.
            if package.starts_with('-') {
                return Ok(ToolOutput::error(format!("invalid package name: {}", package)));
            }
            args.push(package.to_string());
        } else if let Some(package) = package.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            if package.starts_with('-') {
                return Ok(ToolOutput::error(format!("invalid package name: {}", package)));
            }
            args.push(package.to_string());
        }
        args.push("--no-interaction".to_string());

        debug!(args = ?args, "running composer");

        let output = Command::new("composer")
            .args(&args)
            .current_dir(&self.workspace)
            .output()
            .await
            .map_err(|e| ExecutorError::SpawnFailed("composer".to_string(), e.to_string()))?;

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

        info!(action = %action, exit_code = exit_code, "composer finished");

        Ok(ToolOutput {
            is_error: !output.status.success(),
            content,
        })
    }
}

/// Default composer tool description
pub fn default_composer_description() -> String {
    "Run a composer subcommand (install, update, require, remove, show, \
     outdated, validate) against the workspace project."
        .to_string()
}
