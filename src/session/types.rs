// Persisted record shapes for the session module

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One conversation message, appended at each turn boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub ts: DateTime<Utc>,
    pub role: String,
    pub content: String,
}

impl MessageRecord {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            role: role.into(),
            content: content.into(),
        }
    }
}

/// One delegated child run, appended after the child completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildRunRecord {
    pub ts: DateTime<Utc>,
    pub parent_iteration: u32,
    pub role: String,
    pub model: String,
    pub prompt: String,
    pub result: String,
    pub token_count: u32,
}

impl ChildRunRecord {
    pub fn new(
        parent_iteration: u32,
        role: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
        result: impl Into<String>,
        token_count: u32,
    ) -> Self {
        Self {
            ts: Utc::now(),
            parent_iteration,
            role: role.into(),
            model: model.into(),
            prompt: prompt.into(),
            result: result.into(),
            token_count,
        }
    }
}
