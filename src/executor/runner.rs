// Executor - the tool dispatch table
//
// The toolset is fixed at construction: the orchestrator gets the full
// table, delegated children get a role-scoped subset built by `for_role`.
// Nothing registers tools after startup.

use crate::agent::{AgentConfig, ExecutorRef};
use crate::executor::code::{default_code_description, CodeTool};
use crate::executor::composer::{default_composer_description, ComposerTool};
use crate::executor::config::ExecutorConfig;
use crate::executor::credentials::{default_credentials_description, CredentialsTool};
use crate::executor::error::{ExecutorError, Result};
use crate::executor::fs::{default_fs_description, FsTool};
use crate::executor::packagist::{default_packagist_description, PackagistTool};
use crate::executor::shell::{default_shell_description, ShellTool};
use crate::executor::spawn::SpawnAgentTool;
use crate::executor::tool::{load_tool_descriptions, DoneTool, ToolImpl};
use crate::executor::types::{ToolContext, ToolOutput};
use crate::observer::Observer;
use crate::provider::{Provider, RoleResolver, ToolDefinition};
use crate::session::SessionSink;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Executor {
    tools: HashMap<String, Arc<dyn ToolImpl>>,
}

impl Executor {
    /// Build the full orchestrator dispatch table: filesystem, shell, code
    /// sandbox, composer, package search, credentials, delegation and the
    /// done signal.
    pub fn orchestrator(
        config: &ExecutorConfig,
        provider: Provider,
        roles: RoleResolver,
        agent_config: AgentConfig,
        session: Option<Arc<dyn SessionSink>>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Result<Self> {
        let overrides = load_tool_descriptions(&config.tools_toml_path)?;
        let desc = |name: &str, default: String| -> String {
            overrides.get(name).cloned().unwrap_or(default)
        };

        let mut executor = Self {
            tools: HashMap::new(),
        };
        executor.register(Arc::new(FsTool::new(
            &config.workspace,
            false,
            desc("fs", default_fs_description(false)),
        )));
        executor.register(Arc::new(ShellTool::new(
            &config.workspace,
            None,
            config.max_output_bytes,
            desc("shell", default_shell_description(false)),
        )));
        executor.register(Arc::new(CodeTool::new(
            config,
            desc("run_php", default_code_description()),
        )));
        executor.register(Arc::new(ComposerTool::new(
            &config.workspace,
            config.max_output_bytes,
            desc("composer", default_composer_description()),
        )));
        executor.register(Arc::new(PackagistTool::new(desc(
            "search_packages",
            default_packagist_description(),
        ))));
        executor.register(Arc::new(CredentialsTool::new(
            &config.workspace,
            desc("credentials", default_credentials_description()),
        )));
        executor.register(Arc::new(SpawnAgentTool::new(
            provider,
            roles,
            config.clone(),
            agent_config,
            session,
            observer,
            overrides.get("spawn_agent").cloned(),
        )));
        executor.register(Arc::new(DoneTool));

        info!(tools = ?executor.tool_names(), "orchestrator dispatch table built");
        Ok(executor)
    }

    /// Build the scoped dispatch table for a delegated child. Coders can
    /// edit files and run allowlisted commands; every other role is
    /// read-only. No child gets a spawn tool, so delegation stays one
    /// level deep.
    pub fn for_role(role: &str, config: &ExecutorConfig) -> Result<Self> {
        let mut executor = Self {
            tools: HashMap::new(),
        };

        match role {
            "coder" => {
                executor.register(Arc::new(FsTool::new(
                    &config.workspace,
                    false,
                    default_fs_description(false),
                )));
                executor.register(Arc::new(ShellTool::new(
                    &config.workspace,
                    Some(config.shell_allowlist.clone()),
                    config.max_output_bytes,
                    default_shell_description(true),
                )));
            }
            _ => {
                executor.register(Arc::new(FsTool::new(
                    &config.workspace,
                    true,
                    default_fs_description(true),
                )));
            }
        }
        executor.register(Arc::new(DoneTool));

        info!(role = %role, tools = ?executor.tool_names(), "child dispatch table built");
        Ok(executor)
    }

    fn register(&mut self, tool: Arc<dyn ToolImpl>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Dispatch one tool call.
    pub async fn run_tool(
        &self,
        tool_name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ExecutorError::UnknownTool(tool_name.to_string()))?;

        debug!(tool = %tool_name, iteration = ctx.iteration, "dispatching tool call");
        tool.run(input, ctx).await
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|tool| tool.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

#[async_trait::async_trait]
impl ExecutorRef for Executor {
    async fn execute(
        &self,
        tool_name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolOutput, String> {
        self.run_tool(tool_name, input, ctx)
            .await
            .map_err(|e| e.to_string())
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.definitions()
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

    fn orchestrator_in(dir: &std::path::Path) -> Executor {
        Executor::orchestrator(
            &ExecutorConfig::with_workspace(dir),
            test_provider(),
            RoleResolver::new("test-model"),
            AgentConfig::default(),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_orchestrator_toolset() {
        let executor = orchestrator_in(&std::env::temp_dir());
        assert_eq!(
            executor.tool_names(),
            vec![
                "composer",
                "credentials",
                "done",
                "fs",
                "run_php",
                "search_packages",
                "shell",
                "spawn_agent",
            ]
        );
    }

    #[test]
    fn test_coder_toolset_excludes_spawn() {
        let config = ExecutorConfig::with_workspace(std::env::temp_dir());
        let executor = Executor::for_role("coder", &config).unwrap();
        assert_eq!(executor.tool_names(), vec!["done", "fs", "shell"]);
        assert!(!executor.has_tool("spawn_agent"));
    }

    #[test]
    fn test_reviewer_toolset_is_read_only() {
        let config = ExecutorConfig::with_workspace(std::env::temp_dir());
        let executor = Executor::for_role("reviewer", &config).unwrap();
        assert_eq!(executor.tool_names(), vec!["done", "fs"]);

        // Unknown roles get the same minimal set.
        let executor = Executor::for_role("researcher", &config).unwrap();
        assert_eq!(executor.tool_names(), vec!["done", "fs"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let executor = orchestrator_in(&std::env::temp_dir());
        let err = executor
            .run_tool("teleport", json!({}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownTool(_)));
        assert!(err.to_string().contains("teleport"));
    }

    #[tokio::test]
    async fn test_dispatch_reaches_tool() {
        let dir = std::env::temp_dir().join(format!("coqui-runner-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("hello.txt"), "hi there").unwrap();

        let executor = orchestrator_in(&dir);
        let out = executor
            .run_tool(
                "fs",
                json!({"action": "read", "path": "hello.txt"}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(out.content, "hi there");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_description_overrides_from_toml() {
        let dir = std::env::temp_dir().join(format!("coqui-toml-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let toml_path = dir.join("tools.toml");
        std::fs::write(&toml_path, "[fs]\ndescription = \"custom fs description\"\n").unwrap();

        let mut config = ExecutorConfig::with_workspace(&dir);
        config.tools_toml_path = toml_path;
        let executor = Executor::orchestrator(
            &config,
            test_provider(),
            RoleResolver::new("test-model"),
            AgentConfig::default(),
            None,
            None,
        )
        .unwrap();

        let fs_def = executor
            .definitions()
            .into_iter()
            .find(|d| d.name == "fs")
            .unwrap();
        assert_eq!(fs_def.description, "custom fs description");

        std::fs::remove_dir_all(&dir).ok();
    }
}
