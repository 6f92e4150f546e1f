// Filesystem tool - workspace-scoped file operations

use crate::executor::{ExecutorError, Result, ToolContext, ToolOutput};
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct FsInput {
    action: String,
    path: String,
    #[serde(default)]
    content: Option<String>,
}

/// Filesystem tool. All paths resolve inside the workspace; a read-only
/// instance rejects write and delete actions, which is how reviewer-role
/// child agents are scoped.
pub struct FsTool {
    workspace: PathBuf,
    read_only: bool,
    description: String,
}

impl FsTool {
    pub fn new(workspace: impl Into<PathBuf>, read_only: bool, description: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            read_only,
            description: description.into(),
        }
    }

    /// Resolve a workspace-relative path, rejecting absolute paths and any
    /// traversal outside the workspace.
    fn resolve(&self, path: &str) -> std::result::Result<PathBuf, String> {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return Err(format!("absolute paths are not allowed: {}", path));
        }
        for component in candidate.components() {
            match component {
                Component::ParentDir => {
                    return Err(format!("path escapes the workspace: {}", path));
                }
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(format!("unsupported path component in: {}", path)),
            }
        }
        Ok(self.workspace.join(candidate))
    }
}

#[async_trait]
impl crate::executor::ToolImpl for FsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fs".to_string(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["read", "write", "list", "delete"],
                        "description": "Filesystem operation to perform"
                    },
                    "path": {
                        "type": "string",
                        "description": "Path relative to the workspace root"
                    },
                    "content": {
                        "type": "string",
                        "description": "File content, required for write"
                    }
                },
                "required": ["action", "path"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let FsInput {
            action,
            path,
            content,
        } = serde_json::from_value(input)
            .map_err(|e| ExecutorError::InvalidInput("fs".to_string(), e.to_string()))?;

        let target = match self.resolve(&path) {
            Ok(p) => p,
            Err(msg) => return Ok(ToolOutput::error(msg)),
        };

        debug!(action = %action, path = %target.display(), "fs operation");

        if self.read_only && matches!(action.as_str(), "write" | "delete") {
            return Ok(ToolOutput::error(format!(
                "'{}' is not permitted: this agent has read-only filesystem access",
                action
            )));
        }

        match action.as_str() {
            "read" => match tokio::fs::read_to_string(&target).await {
                Ok(text) => Ok(ToolOutput::success(text)),
                Err(e) => Ok(ToolOutput::error(format!("failed to read {}: {}", path, e))),
            },
            "write" => {
                let Some(content) = content else {
                    return Err(ExecutorError::InvalidInput(
                        "fs".to_string(),
                        "'content' is required for write".to_string(),
                    ));
                };
                if let Some(parent) = target.parent() {
                    if let Err(e) = tokio::fs::create_dir_all(parent).await {
                        return Ok(ToolOutput::error(format!(
                            "failed to create parent directories for {}: {}",
                            path, e
                        )));
                    }
                }
                match tokio::fs::write(&target, content.as_bytes()).await {
                    Ok(()) => Ok(ToolOutput::success(format!(
                        "Wrote {} bytes to {}",
                        content.len(),
                        path
                    ))),
                    Err(e) => Ok(ToolOutput::error(format!("failed to write {}: {}", path, e))),
                }
            }
            "list" => {
                let mut entries = match tokio::fs::read_dir(&target).await {
                    Ok(rd) => rd,
                    Err(e) => {
                        return Ok(ToolOutput::error(format!("failed to list {}: {}", path, e)))
                    }
                };
                let mut names = Vec::new();
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let mut name = entry.file_name().to_string_lossy().into_owned();
                    if entry.path().is_dir() {
                        name.push('/');
                    }
                    names.push(name);
                }
                names.sort();
                Ok(ToolOutput::success(names.join("\n")))
            }
            "delete" => match tokio::fs::remove_file(&target).await {
                Ok(()) => Ok(ToolOutput::success(format!("Deleted {}", path))),
                Err(e) => Ok(ToolOutput::error(format!("failed to delete {}: {}", path, e))),
            },
            other => Ok(ToolOutput::error(format!("unknown fs action: {}", other))),
        }
    }
}

/// Default fs tool description
pub fn default_fs_description(read_only: bool) -> String {
    if read_only {
        "Read files and list directories inside the workspace. \
         Paths are relative to the workspace root. Write access is not granted."
            .to_string()
    } else {
        "Read, write, list and delete files inside the workspace. \
         Paths are relative to the workspace root; writes create parent directories."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ToolImpl;
    use serde_json::json;

    fn temp_workspace() -> PathBuf {
        let dir = std::env::temp_dir()
            .join("coqui-fs-tests")
            .join(uuid::Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let ws = temp_workspace();
        let tool = FsTool::new(&ws, false, default_fs_description(false));
        let ctx = ToolContext::default();

        let out = tool
            .run(json!({"action": "write", "path": "notes/a.txt", "content": "hello"}), &ctx)
            .await
            .unwrap();
        assert!(!out.is_error);

        let out = tool
            .run(json!({"action": "read", "path": "notes/a.txt"}), &ctx)
            .await
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(out.content, "hello");
    }

    #[tokio::test]
    async fn test_read_only_rejects_write_and_delete() {
        let ws = temp_workspace();
        let tool = FsTool::new(&ws, true, default_fs_description(true));
        let ctx = ToolContext::default();

        let out = tool
            .run(json!({"action": "write", "path": "x.txt", "content": "no"}), &ctx)
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("read-only"));

        let out = tool
            .run(json!({"action": "delete", "path": "x.txt"}), &ctx)
            .await
            .unwrap();
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let ws = temp_workspace();
        let tool = FsTool::new(&ws, false, default_fs_description(false));
        let ctx = ToolContext::default();

        let out = tool
            .run(json!({"action": "read", "path": "../outside.txt"}), &ctx)
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("escapes"));

        let out = tool
            .run(json!({"action": "read", "path": "/etc/passwd"}), &ctx)
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("absolute"));
    }

    #[tokio::test]
    async fn test_list_directory() {
        let ws = temp_workspace();
        let tool = FsTool::new(&ws, false, default_fs_description(false));
        let ctx = ToolContext::default();

        std::fs::write(ws.join("b.txt"), "b").unwrap();
        std::fs::create_dir(ws.join("sub")).unwrap();

        let out = tool.run(json!({"action": "list", "path": "."}), &ctx).await.unwrap();
        assert!(!out.is_error);
        assert!(out.content.contains("b.txt"));
        assert!(out.content.contains("sub/"));
    }

    #[tokio::test]
    async fn test_missing_content_for_write() {
        let ws = temp_workspace();
        let tool = FsTool::new(&ws, false, default_fs_description(false));
        let ctx = ToolContext::default();

        let result = tool.run(json!({"action": "write", "path": "x.txt"}), &ctx).await;
        assert!(result.is_err());
    }
}
