// Session storage - append-only JSONL logs keyed by session id

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use super::config::SessionConfig;
use super::error::SessionError;
use super::types::{ChildRunRecord, MessageRecord};
use super::SessionSink;
use serde::Serialize;
use tracing::{debug, info, warn};

const MESSAGES_FILE: &str = "messages.jsonl";
const CHILD_RUNS_FILE: &str = "child_runs.jsonl";

/// Per-session store. Each session owns a directory with two append-only
/// JSONL files: the conversation message log and the child-run audit log.
/// Writes are ordered by call order and never batched.
#[derive(Debug, Clone)]
pub struct SessionStore {
    id: String,
    dir: PathBuf,
}

impl SessionStore {
    /// Create a fresh session with a generated id.
    pub fn create(config: &SessionConfig) -> Result<Self, SessionError> {
        let id = uuid::Uuid::new_v4().to_string();
        let dir = config.root.join(&id);
        fs::create_dir_all(&dir).map_err(|e| SessionError::StoreFailed(e.to_string()))?;
        info!(session_id = %id, dir = %dir.display(), "created session");
        Ok(Self { id, dir })
    }

    /// Open an existing session by id.
    pub fn open(config: &SessionConfig, id: &str) -> Result<Self, SessionError> {
        let dir = config.root.join(id);
        if !dir.is_dir() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        debug!(session_id = %id, "opened session");
        Ok(Self {
            id: id.to_string(),
            dir,
        })
    }

    /// Most recently modified session id under the root, if any.
    pub fn latest(config: &SessionConfig) -> Option<String> {
        let entries = fs::read_dir(&config.root).ok()?;
        let mut sessions: Vec<(std::time::SystemTime, String)> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let modified = e.metadata().ok()?.modified().ok()?;
                Some((modified, e.file_name().to_string_lossy().into_owned()))
            })
            .collect();
        sessions.sort_by(|a, b| b.0.cmp(&a.0));
        sessions.into_iter().next().map(|(_, id)| id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reload the message log, e.g. when resuming a session after restart.
    pub fn load_messages(&self) -> Result<Vec<MessageRecord>, SessionError> {
        self.load_jsonl(MESSAGES_FILE)
    }

    /// Reload the child-run audit log.
    pub fn load_child_runs(&self) -> Result<Vec<ChildRunRecord>, SessionError> {
        self.load_jsonl(CHILD_RUNS_FILE)
    }

    fn load_jsonl<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, SessionError> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&path).map_err(|e| SessionError::LoadFailed(e.to_string()))?;
        let mut records = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let record =
                serde_json::from_str(line).map_err(|e| SessionError::LoadFailed(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    fn append<T: Serialize>(&self, file: &str, record: &T) -> Result<(), SessionError> {
        let line =
            serde_json::to_string(record).map_err(|e| SessionError::StoreFailed(e.to_string()))?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))
            .map_err(|e| SessionError::StoreFailed(e.to_string()))?;
        writeln!(f, "{}", line).map_err(|e| SessionError::StoreFailed(e.to_string()))?;
        Ok(())
    }
}

impl SessionSink for SessionStore {
    fn add_message(&self, role: &str, content: &str) {
        let record = MessageRecord::new(role, content);
        if let Err(e) = self.append(MESSAGES_FILE, &record) {
            warn!(session_id = %self.id, error = %e, "failed to persist message");
        }
    }

    fn log_child_run(&self, record: ChildRunRecord) {
        if let Err(e) = self.append(CHILD_RUNS_FILE, &record) {
            warn!(session_id = %self.id, error = %e, "failed to persist child run");
        }
    }
}
