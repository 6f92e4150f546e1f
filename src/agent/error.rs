// Agent errors

use thiserror::Error;

/// The only two conditions that terminate an agent run without a done
/// signal, plus request construction failures. Everything else recovers
/// locally as an error tool result.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Iteration budget ({max}) exhausted without completion")]
    BudgetExhausted { max: u32 },

    #[error("Request build error: {0}")]
    RequestBuild(&'static str),
}
