// Agent module - core orchestration layer

pub mod config;
pub mod error;
pub mod loop_;
pub mod types;

pub use error::AgentError;
pub use loop_::{run_agent, Agent, BrainRef, ExecutorRef, RunOptions};
pub use types::{AgentConfig, AgentRunOutput, ToolCall};
