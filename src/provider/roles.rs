// Role resolver - maps delegation roles to model identifiers

use std::collections::HashMap;
use tracing::debug;

/// Resolves a child-agent role to a concrete model identifier, falling back
/// to the primary model when the role is unmapped.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    models: HashMap<String, String>,
    primary: String,
}

impl RoleResolver {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            models: HashMap::new(),
            primary: primary.into(),
        }
    }

    /// Load role mappings from the environment. Roles without an override
    /// resolve to the primary model.
    pub fn from_env(primary: impl Into<String>) -> Self {
        dotenvy::dotenv().ok();

        let mut resolver = Self::new(primary);
        for (role, var) in [
            ("coder", "COQUI_CODER_MODEL"),
            ("reviewer", "COQUI_REVIEWER_MODEL"),
        ] {
            if let Ok(model) = std::env::var(var) {
                resolver.models.insert(role.to_string(), model);
            }
        }
        resolver
    }

    pub fn with_role(mut self, role: impl Into<String>, model: impl Into<String>) -> Self {
        self.models.insert(role.into(), model.into());
        self
    }

    /// Resolve a role to its model identifier.
    pub fn resolve(&self, role: &str) -> &str {
        match self.models.get(role) {
            Some(model) => model,
            None => {
                debug!(role = %role, primary = %self.primary, "role unmapped, using primary model");
                &self.primary
            }
        }
    }
}
