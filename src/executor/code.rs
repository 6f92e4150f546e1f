// Sandboxed code executor - isolated subprocess with timeout enforcement
//
// Submitted code passes the sanitizer, is wrapped with a bootstrap
// preamble, persisted to a scratch file and run in a subprocess confined
// to the workspace. The subprocess inherits credentials from the workspace
// .env so submitted code can read them without the model ever seeing the
// values. The scratch file is removed on every exit path.

use crate::executor::credentials::{load_env_file, ENV_FILE};
use crate::executor::types::truncate_output;
use crate::executor::{ExecutorConfig, ExecutorError, Result, ToolContext, ToolOutput};
use crate::provider::ToolDefinition;
use crate::sanitizer;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Independent truncation cap for each of stdout and stderr.
const STREAM_CAP_BYTES: usize = 32 * 1024;

/// Subdirectory of the workspace holding transient script files.
const SCRATCH_DIR: &str = ".scratch";

#[derive(Debug, Deserialize)]
struct CodeInput {
    code: String,
    #[serde(default)]
    timeout: Option<u64>,
}

/// Sandboxed code execution tool.
pub struct CodeTool {
    workspace: PathBuf,
    interpreter: String,
    default_timeout_secs: u64,
    description: String,
}

impl CodeTool {
    pub fn new(config: &ExecutorConfig, description: impl Into<String>) -> Self {
        Self {
            workspace: config.workspace.clone(),
            interpreter: config.interpreter.clone(),
            default_timeout_secs: config.code_timeout_secs,
            description: description.into(),
        }
    }

    fn is_php(&self) -> bool {
        std::path::Path::new(&self.interpreter)
            .file_stem()
            .map(|s| s.to_string_lossy().starts_with("php"))
            .unwrap_or(false)
    }

    /// Wrap submitted code in the bootstrap preamble: strict types and the
    /// workspace autoloader when present. Submitted code is never run as-is.
    fn wrap_code(&self, code: &str) -> String {
        if !self.is_php() {
            return code.to_string();
        }
        let body = code.trim_start().strip_prefix("<?php").unwrap_or(code);
        format!(
            "<?php\n\
             declare(strict_types=1);\n\
             if (file_exists(__DIR__ . '/../vendor/autoload.php')) {{\n\
             \x20   require __DIR__ . '/../vendor/autoload.php';\n\
             }}\n\
             {}\n",
            body
        )
    }

    fn script_path(&self) -> PathBuf {
        let ext = if self.is_php() { "php" } else { "script" };
        self.workspace
            .join(SCRATCH_DIR)
            .join(format!("coqui-{}.{}", uuid::Uuid::new_v4(), ext))
    }

    async fn run_script(&self, path: &PathBuf, timeout_secs: u64) -> ToolOutput {
        let credentials = load_env_file(&self.workspace.join(ENV_FILE));

        let mut command = Command::new(&self.interpreter);
        command
            .arg(path)
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // SIGKILL on drop guarantees bounded teardown on timeout.
            .kill_on_drop(true)
            .envs(credentials);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ToolOutput::error(format!(
                    "failed to spawn interpreter '{}': {}",
                    self.interpreter, e
                ))
            }
        };

        let start = Instant::now();
        let waited = timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await;

        match waited {
            Err(_) => {
                warn!(timeout_secs = timeout_secs, "script timed out, killing subprocess");
                ToolOutput::error(format!("Script timed out after {}s.", timeout_secs))
            }
            Ok(Err(e)) => ToolOutput::error(format!("failed to collect script output: {}", e)),
            Ok(Ok(output)) => {
                let exit_code = output.status.code().unwrap_or(-1);
                let stdout =
                    truncate_output(&String::from_utf8_lossy(&output.stdout), STREAM_CAP_BYTES);
                let stderr =
                    truncate_output(&String::from_utf8_lossy(&output.stderr), STREAM_CAP_BYTES);

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

                info!(
                    exit_code = exit_code,
                    duration_ms = start.elapsed().as_millis() as u64,
                    output_bytes = content.len(),
                    "script completed"
                );

                ToolOutput {
                    is_error: !output.status.success(),
                    content,
                }
            }
        }
    }
}

#[async_trait]
impl crate::executor::ToolImpl for CodeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "run_php".to_string(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "The code to execute"
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Wall-clock timeout in seconds (default 30)"
                    }
                },
                "required": ["code"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let CodeInput { code, timeout } = serde_json::from_value(input)
            .map_err(|e| ExecutorError::InvalidInput("run_php".to_string(), e.to_string()))?;

        if code.trim().is_empty() {
            return Ok(ToolOutput::error("No code provided."));
        }

        let issues = sanitizer::validate(&code);
        if !issues.is_empty() {
            let listed = issues
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n");
            return Ok(ToolOutput::error(format!(
                "Code rejected by the sanitizer:\n{}\nRewrite the code without these constructs.",
                listed
            )));
        }

        let timeout_secs = timeout.unwrap_or(self.default_timeout_secs).max(1);
        let path = self.script_path();

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(ToolOutput::error(format!(
                    "failed to create scratch directory: {}",
                    e
                )));
            }
        }
        if let Err(e) = tokio::fs::write(&path, self.wrap_code(&code)).await {
            return Ok(ToolOutput::error(format!(
                "failed to persist script file: {}",
                e
            )));
        }

        debug!(path = %path.display(), timeout_secs = timeout_secs, "running sandboxed script");
        let result = self.run_script(&path, timeout_secs).await;

        // Mandatory cleanup on every exit path, not best-effort.
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "failed to remove scratch file");
        }

        Ok(result)
    }
}

/// Default code tool description
pub fn default_code_description() -> String {
    "Execute PHP code in a sandboxed subprocess with a wall-clock timeout. \
     The project autoloader is preloaded and stored credentials are available \
     via getenv(). Dangerous constructs are rejected before execution."
        .to_string()
}
