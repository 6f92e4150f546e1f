// Session storage configuration

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Root directory holding one subdirectory per session.
    pub root: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let root = dirs::home_dir()
            .map(|p| p.join(".coqui").join("sessions"))
            .unwrap_or_else(|| PathBuf::from(".coqui-sessions"));
        Self { root }
    }
}
