// Execution policy gate - interactive approval for gated tool invocations
//
// The gate is the primary security boundary of the runtime. It inspects
// every tool invocation before dispatch and, for gated tool/action pairs,
// blocks on a human yes/no confirmation. This is the single intentional
// unbounded suspension point in the pipeline.

use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Maximum rendered length for a string argument in the approval prompt.
const DISPLAY_TRUNCATE_CHARS: usize = 120;

/// Outcome of a policy check, consumed immediately by the agent loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionDecision {
    Allow,
    Deny(String),
}

/// Which invocations of a tool are gated.
#[derive(Debug, Clone)]
pub enum GateRule {
    /// Gate every invocation of the tool.
    All,
    /// Gate only invocations whose discriminator value is in the list.
    Actions(Vec<String>),
}

/// Interactive confirmation channel. Blocks until the human answers.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Terminal confirmer reading a y/n line from stdin.
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{}\nExecute? [y/N] ", prompt);
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Policy check consulted by the agent loop before every tool dispatch.
pub trait Gate: Send + Sync {
    fn should_execute(&self, tool_name: &str, input: &Value) -> ExecutionDecision;
}

/// Gate that allows everything. Used for child agents, whose spawning
/// already passed the parent's gate.
pub struct NoGate;

impl Gate for NoGate {
    fn should_execute(&self, _tool_name: &str, _input: &Value) -> ExecutionDecision {
        ExecutionDecision::Allow
    }
}

/// Interactive policy gate with per-tool rules.
pub struct PolicyGate {
    rules: HashMap<String, GateRule>,
    /// Per-tool override for the discriminator argument key. Tools without
    /// an entry are probed at `action`, then `command`.
    gate_keys: HashMap<String, String>,
    confirmer: Box<dyn Confirmer>,
}

impl PolicyGate {
    pub fn new(rules: HashMap<String, GateRule>, confirmer: Box<dyn Confirmer>) -> Self {
        Self {
            rules,
            gate_keys: HashMap::new(),
            confirmer,
        }
    }

    /// Default rules for the orchestrator toolset: anything that mutates the
    /// workspace or spawns a process is gated.
    pub fn default_rules() -> HashMap<String, GateRule> {
        let mut rules = HashMap::new();
        rules.insert("shell".to_string(), GateRule::All);
        rules.insert("run_php".to_string(), GateRule::All);
        // Children run ungated, so the delegation itself must be approved.
        rules.insert("spawn_agent".to_string(), GateRule::All);
        rules.insert(
            "fs".to_string(),
            GateRule::Actions(vec!["write".into(), "delete".into()]),
        );
        rules.insert(
            "credentials".to_string(),
            GateRule::Actions(vec!["set".into(), "delete".into()]),
        );
        rules.insert(
            "composer".to_string(),
            GateRule::Actions(vec!["require".into(), "remove".into(), "update".into()]),
        );
        rules
    }

    /// Override the discriminator key for one tool.
    pub fn with_gate_key(mut self, tool: impl Into<String>, key: impl Into<String>) -> Self {
        self.gate_keys.insert(tool.into(), key.into());
        self
    }

    /// Resolve the discriminator value for an invocation, if any.
    fn action_value<'a>(&self, tool_name: &str, input: &'a Value) -> Option<&'a str> {
        if let Some(key) = self.gate_keys.get(tool_name) {
            return input.get(key).and_then(Value::as_str);
        }
        input
            .get("action")
            .or_else(|| input.get("command"))
            .and_then(Value::as_str)
    }

    fn is_gated(&self, tool_name: &str, input: &Value) -> bool {
        let Some(rule) = self.rules.get(tool_name) else {
            return false;
        };
        match rule {
            GateRule::All => true,
            GateRule::Actions(actions) => match self.action_value(tool_name, input) {
                Some(action) => actions.iter().any(|a| a == action),
                // No discriminator present: gate by default, conservatively.
                None => true,
            },
        }
    }
}

impl Gate for PolicyGate {
    fn should_execute(&self, tool_name: &str, input: &Value) -> ExecutionDecision {
        if !self.is_gated(tool_name, input) {
            debug!(tool = %tool_name, "tool not gated, allowing");
            return ExecutionDecision::Allow;
        }

        let prompt = format!(
            "Tool '{}' requests execution:\n{}",
            tool_name,
            render_arguments(input)
        );

        if self.confirmer.confirm(&prompt) {
            info!(tool = %tool_name, "execution approved");
            ExecutionDecision::Allow
        } else {
            info!(tool = %tool_name, "execution denied");
            ExecutionDecision::Deny(format!("User denied execution of '{}'", tool_name))
        }
    }
}

/// Render tool arguments for the approval prompt: one line per key, strings
/// truncated with newlines collapsed, scalars literal, nested values
/// abbreviated.
pub fn render_arguments(input: &Value) -> String {
    match input {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("  {}: {}", k, render_value(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => format!("  {}", render_value(other)),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let flat = s.replace('\n', " ");
            if flat.chars().count() > DISPLAY_TRUNCATE_CHARS {
                let truncated: String = flat.chars().take(DISPLAY_TRUNCATE_CHARS).collect();
                format!("{}...", truncated)
            } else {
                flat
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) => "[...]".to_string(),
        Value::Object(_) => "{...}".to_string(),
    }
}
