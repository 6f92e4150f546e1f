// Session module - persistent conversation and child-run audit logs

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::SessionConfig;
pub use error::SessionError;
pub use store::SessionStore;
pub use types::{ChildRunRecord, MessageRecord};

/// Write-side interface consumed by the agent loop. All writes are
/// fire-and-forget: implementations swallow and log their own failures so a
/// persistence problem can never fail a run.
pub trait SessionSink: Send + Sync {
    /// Append one conversation message at a turn boundary.
    fn add_message(&self, role: &str, content: &str);

    /// Append one child-run audit entry after a delegated run completes.
    fn log_child_run(&self, record: ChildRunRecord);
}
