// Agent configuration loading

use super::AgentConfig;
use tracing::warn;

/// Parse an environment variable, logging a warning if the value is present
/// but invalid.
fn parse_env_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => match v.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = name, value = %v, "invalid env var value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

impl AgentConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = AgentConfig::default();
        config.max_iterations = parse_env_var("COQUI_MAX_ITERATIONS", config.max_iterations);
        config.child_max_iterations =
            parse_env_var("COQUI_CHILD_MAX_ITERATIONS", config.child_max_iterations);
        if let Ok(prompt) = std::env::var("COQUI_SYSTEM_PROMPT") {
            config.system_prompt = prompt;
        }
        config
    }
}
