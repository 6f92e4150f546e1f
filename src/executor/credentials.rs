// Credentials tool - scoped KEY=VALUE store on the workspace .env file
//
// Values are written for the sandboxed code executor to inject into its
// subprocess environment. They are never echoed back to the model: get and
// list report existence only.

use crate::executor::{ExecutorError, Result, ToolContext, ToolOutput};
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, info};

pub const ENV_FILE: &str = ".env";

/// Parse newline-delimited KEY=VALUE content. `#`-prefixed comment lines and
/// blank lines are skipped; values wrapped in matching single or double
/// quotes are unwrapped.
pub fn parse_env_lines(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            &value[1..value.len() - 1]
        } else {
            value
        };
        pairs.push((key.to_string(), value.to_string()));
    }
    pairs
}

/// Serialize pairs back to file content, quoting values that need it.
fn serialize_env_lines(pairs: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        if value.contains(' ') || value.contains('#') {
            out.push_str(&format!("{}=\"{}\"\n", key, value));
        } else {
            out.push_str(&format!("{}={}\n", key, value));
        }
    }
    out
}

/// Load the env file, returning an empty set when it does not exist.
pub fn load_env_file(path: &std::path::Path) -> Vec<(String, String)> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_env_lines(&content),
        Err(_) => Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsInput {
    action: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

/// Credential store tool operating on `<workspace>/.env`.
pub struct CredentialsTool {
    env_path: PathBuf,
    description: String,
}

impl CredentialsTool {
    pub fn new(workspace: impl Into<PathBuf>, description: impl Into<String>) -> Self {
        Self {
            env_path: workspace.into().join(ENV_FILE),
            description: description.into(),
        }
    }

    fn require_key(input_key: Option<String>) -> Result<String> {
        let key = input_key.unwrap_or_default();
        let key = key.trim();
        if key.is_empty() {
            return Err(ExecutorError::InvalidInput(
                "credentials".to_string(),
                "'key' is required".to_string(),
            ));
        }
        if key.contains('=') || key.contains(char::is_whitespace) {
            return Err(ExecutorError::InvalidInput(
                "credentials".to_string(),
                format!("invalid key: {}", key),
            ));
        }
        Ok(key.to_string())
    }

    fn write_pairs(&self, pairs: &[(String, String)]) -> std::io::Result<()> {
        std::fs::write(&self.env_path, serialize_env_lines(pairs))
    }
}

#[async_trait]
impl crate::executor::ToolImpl for CredentialsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "credentials".to_string(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["set", "get", "list", "delete"],
                        "description": "Credential operation"
                    },
                    "key": {
                        "type": "string",
                        "description": "Credential name, e.g. STRIPE_API_KEY"
                    },
                    "value": {
                        "type": "string",
                        "description": "Credential value, required for set"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let CredentialsInput { action, key, value } = serde_json::from_value(input)
            .map_err(|e| ExecutorError::InvalidInput("credentials".to_string(), e.to_string()))?;

        debug!(action = %action, "credentials operation");

        match action.as_str() {
            "set" => {
                let key = Self::require_key(key)?;
                let Some(value) = value else {
                    return Err(ExecutorError::InvalidInput(
                        "credentials".to_string(),
                        "'value' is required for set".to_string(),
                    ));
                };
                let mut pairs = load_env_file(&self.env_path);
                match pairs.iter_mut().find(|(k, _)| *k == key) {
                    Some(pair) => pair.1 = value,
                    None => pairs.push((key.clone(), value)),
                }
                match self.write_pairs(&pairs) {
                    Ok(()) => {
                        info!(key = %key, "credential stored");
                        Ok(ToolOutput::success(format!(
                            "Stored credential '{}'. It is available to sandboxed code via getenv().",
                            key
                        )))
                    }
                    Err(e) => Ok(ToolOutput::error(format!("failed to store credential: {}", e))),
                }
            }
            "get" => {
                let key = Self::require_key(key)?;
                let pairs = load_env_file(&self.env_path);
                if pairs.iter().any(|(k, _)| *k == key) {
                    Ok(ToolOutput::success(format!(
                        "Credential '{}' is set (value hidden; available to sandboxed code).",
                        key
                    )))
                } else {
                    Ok(ToolOutput::error(format!("credential '{}' is not set", key)))
                }
            }
            "list" => {
                let pairs = load_env_file(&self.env_path);
                if pairs.is_empty() {
                    return Ok(ToolOutput::success("No credentials stored."));
                }
                let keys = pairs
                    .iter()
                    .map(|(k, _)| format!("{}=****", k))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(ToolOutput::success(keys))
            }
            "delete" => {
                let key = Self::require_key(key)?;
                let mut pairs = load_env_file(&self.env_path);
                let before = pairs.len();
                pairs.retain(|(k, _)| *k != key);
                if pairs.len() == before {
                    return Ok(ToolOutput::error(format!("credential '{}' is not set", key)));
                }
                match self.write_pairs(&pairs) {
                    Ok(()) => Ok(ToolOutput::success(format!("Deleted credential '{}'", key))),
                    Err(e) => Ok(ToolOutput::error(format!("failed to delete credential: {}", e))),
                }
            }
            other => Ok(ToolOutput::error(format!(
                "unknown credentials action: {}",
                other
            ))),
        }
    }
}

/// Default credentials tool description
pub fn default_credentials_description() -> String {
    "Manage credentials stored in the workspace .env file. Values are injected \
     into sandboxed code execution as environment variables and are never shown \
     in tool output."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ToolImpl;
    use serde_json::json;

    fn temp_workspace() -> PathBuf {
        let dir = std::env::temp_dir()
            .join("coqui-cred-tests")
            .join(uuid::Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_env_lines() {
        let content = r#"
# Comment line
PLAIN=value
QUOTED="has spaces"
SINGLE='single quoted'

EMPTY=
NOT_A_PAIR
"#;
        let pairs = parse_env_lines(content);
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], ("PLAIN".to_string(), "value".to_string()));
        assert_eq!(pairs[1], ("QUOTED".to_string(), "has spaces".to_string()));
        assert_eq!(pairs[2], ("SINGLE".to_string(), "single quoted".to_string()));
        assert_eq!(pairs[3], ("EMPTY".to_string(), "".to_string()));
    }

    #[test]
    fn test_parse_mismatched_quotes_kept_verbatim() {
        let pairs = parse_env_lines("KEY=\"unterminated");
        assert_eq!(pairs[0].1, "\"unterminated");
    }

    #[tokio::test]
    async fn test_set_get_list_delete() {
        let ws = temp_workspace();
        let tool = CredentialsTool::new(&ws, default_credentials_description());
        let ctx = ToolContext::default();

        let out = tool
            .run(json!({"action": "set", "key": "API_KEY", "value": "secret-123"}), &ctx)
            .await
            .unwrap();
        assert!(!out.is_error);
        // Value must never appear in tool output
        assert!(!out.content.contains("secret-123"));

        let out = tool.run(json!({"action": "get", "key": "API_KEY"}), &ctx).await.unwrap();
        assert!(!out.is_error);
        assert!(!out.content.contains("secret-123"));

        let out = tool.run(json!({"action": "list"}), &ctx).await.unwrap();
        assert!(out.content.contains("API_KEY=****"));
        assert!(!out.content.contains("secret-123"));

        let out = tool.run(json!({"action": "delete", "key": "API_KEY"}), &ctx).await.unwrap();
        assert!(!out.is_error);

        let out = tool.run(json!({"action": "get", "key": "API_KEY"}), &ctx).await.unwrap();
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn test_set_persists_to_env_file() {
        let ws = temp_workspace();
        let tool = CredentialsTool::new(&ws, default_credentials_description());
        let ctx = ToolContext::default();

        tool.run(json!({"action": "set", "key": "DB_URL", "value": "postgres://x"}), &ctx)
            .await
            .unwrap();

        let loaded = load_env_file(&ws.join(ENV_FILE));
        assert_eq!(loaded, vec![("DB_URL".to_string(), "postgres://x".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_key_is_invalid_input() {
        let ws = temp_workspace();
        let tool = CredentialsTool::new(&ws, default_credentials_description());
        let result = tool
            .run(json!({"action": "set", "value": "v"}), &ToolContext::default())
            .await;
        assert!(result.is_err());
    }
}
