// Executor module - tool dispatch table and tool implementations

pub mod code;
pub mod composer;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fs;
pub mod packagist;
pub mod runner;
pub mod shell;
pub mod spawn;
pub mod tool;
pub mod types;

pub use config::ExecutorConfig;
pub use error::{ExecutorError, Result};
pub use runner::Executor;
pub use tool::{ToolImpl, DONE_TOOL};
pub use types::{ToolContext, ToolOutput};
