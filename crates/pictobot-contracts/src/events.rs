use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventDetails = Map<String, Value>;

/// Kinds of records a session writes to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    Started,
    StateChanged,
    Finished,
    Superseded,
}

impl SessionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEvent::Started => "session_started",
            SessionEvent::StateChanged => "session_state",
            SessionEvent::Finished => "session_finished",
            SessionEvent::Superseded => "session_superseded",
        }
    }
}

/// Identity stamped on every record of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventScope {
    pub session_id: u64,
    pub slot: String,
    pub request_id: String,
}

const RESERVED_FIELDS: &[&str] = &["type", "bot_id", "session_id", "slot", "request_id", "ts"];

/// Append-only JSONL log of session lifecycle records.
///
/// Every line carries `type`, `bot_id`, `session_id`, `slot`, `request_id`
/// and `ts`; event details are merged in but never replace those fields.
/// The file is opened on the first record and kept open.
#[derive(Debug, Clone)]
pub struct SessionEventLog {
    inner: Arc<LogInner>,
}

#[derive(Debug)]
struct LogInner {
    path: PathBuf,
    bot_id: String,
    file: Mutex<Option<File>>,
}

impl SessionEventLog {
    pub fn new(path: impl Into<PathBuf>, bot_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LogInner {
                path: path.into(),
                bot_id: bot_id.into(),
                file: Mutex::new(None),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn record(
        &self,
        scope: &EventScope,
        event: SessionEvent,
        details: EventDetails,
    ) -> anyhow::Result<Value> {
        let mut row: EventDetails = details
            .into_iter()
            .filter(|(key, _)| !RESERVED_FIELDS.contains(&key.as_str()))
            .collect();
        row.insert("type".to_string(), Value::from(event.as_str()));
        row.insert("bot_id".to_string(), Value::from(self.inner.bot_id.as_str()));
        row.insert("session_id".to_string(), Value::from(scope.session_id));
        row.insert("slot".to_string(), Value::from(scope.slot.as_str()));
        row.insert("request_id".to_string(), Value::from(scope.request_id.as_str()));
        row.insert(
            "ts".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)),
        );

        let row = Value::Object(row);
        let mut line = serde_json::to_string(&row)?;
        line.push('\n');

        let mut file = self
            .inner
            .file
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if file.is_none() {
            *file = Some(self.open()?);
        }
        if let Some(file) = file.as_mut() {
            file.write_all(line.as_bytes())
                .with_context(|| format!("failed to append to {}", self.inner.path.display()))?;
        }
        Ok(row)
    }

    fn open(&self) -> anyhow::Result<File> {
        let path = &self.inner.path;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))
    }
}
