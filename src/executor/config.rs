// Executor configuration

use std::path::PathBuf;

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Workspace root. The sole mutable shared resource: file I/O, shell
    /// commands, sandboxed code and credential storage are all confined
    /// to it.
    pub workspace: PathBuf,
    /// Path to tools.toml with tool description overrides
    pub tools_toml_path: PathBuf,
    /// Interpreter binary for sandboxed code execution
    pub interpreter: String,
    /// Default sandbox timeout in seconds
    pub code_timeout_secs: u64,
    /// Output cap per stream for shell-style tools, in bytes
    pub max_output_bytes: usize,
    /// Commands child-agent shells may run (first token match)
    pub shell_allowlist: Vec<String>,
}

impl ExecutorConfig {
    pub fn with_workspace(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Default::default()
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            tools_toml_path: PathBuf::from("tools.toml"),
            interpreter: String::from("php"),
            code_timeout_secs: 30,
            max_output_bytes: 1_048_576, // 1MB
            shell_allowlist: [
                "ls", "cat", "head", "tail", "grep", "find", "wc", "diff", "php", "composer",
                "git", "echo",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
