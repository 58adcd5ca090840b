use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pictobot_contracts::generation::{Artifact, Attribution, ProviderOutcome};
use pictobot_contracts::GenerationError;

use crate::controls::ControlRegistry;
use crate::provider::{ProviderClient, ProviderHandle};
use crate::session::{SessionConfig, SessionContext};
use crate::slots::SlotRegistry;
use crate::surface::{MessageRef, RegenerateControl, ResultContent, SurfaceAdapter};

pub(crate) fn artifacts(count: usize) -> Vec<Artifact> {
    (0..count)
        .map(|index| {
            Artifact::from_url(
                format!("https://img.example/{index}.png"),
                Attribution {
                    provider: "scripted".to_string(),
                    ..Attribution::default()
                },
            )
        })
        .collect()
}

#[derive(Clone)]
pub(crate) enum Script {
    /// Resolves inside `submit` after `delay`.
    Ready { delay: Duration, outcome: ProviderOutcome },
    /// Returns a job that reports `pending` polls before `outcome`.
    Job { pending: u32, outcome: ProviderOutcome },
    /// Job that never leaves pending.
    Never,
}

pub(crate) struct ScriptedProvider {
    script: Script,
    submits: AtomicU32,
    polls: Mutex<HashMap<String, u32>>,
}

impl ScriptedProvider {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            submits: AtomicU32::new(0),
            polls: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn submits(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, _prompt: &str) -> Result<ProviderHandle, GenerationError> {
        let index = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.script {
            Script::Ready { delay, outcome } => {
                tokio::time::sleep(*delay).await;
                Ok(ProviderHandle::Ready(outcome.clone()))
            }
            Script::Job { .. } | Script::Never => Ok(ProviderHandle::Job {
                id: format!("job-{index}"),
                status_url: format!("https://api.example/jobs/{index}"),
            }),
        }
    }

    async fn poll(&self, handle: &ProviderHandle) -> Result<ProviderOutcome, GenerationError> {
        let id = match handle {
            ProviderHandle::Ready(outcome) => return Ok(outcome.clone()),
            ProviderHandle::Job { id, .. } => id.clone(),
        };
        let seen = {
            let mut polls = self.polls.lock().expect("poll counter lock");
            let count = polls.entry(id).or_insert(0);
            *count += 1;
            *count
        };
        match &self.script {
            Script::Job { pending, outcome } if seen > *pending => Ok(outcome.clone()),
            _ => Ok(ProviderOutcome::Pending),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SurfaceCall {
    Send { slot: String, message: String, text: String },
    Update { message: String, text: String },
    Remove { message: String },
    Publish { message: String, artifacts: usize, custom_id: String },
    Error { message: String, text: String },
}

impl SurfaceCall {
    pub(crate) fn message(&self) -> &str {
        match self {
            SurfaceCall::Send { message, .. }
            | SurfaceCall::Update { message, .. }
            | SurfaceCall::Remove { message }
            | SurfaceCall::Publish { message, .. }
            | SurfaceCall::Error { message, .. } => message,
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingSurface {
    pub(crate) fail_send: bool,
    pub(crate) fail_publish: bool,
    /// Message edits never complete.
    pub(crate) stall_updates: bool,
    pub(crate) calls: Mutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    pub(crate) fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn calls_for(&self, message: &MessageRef) -> Vec<SurfaceCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.message() == message.as_str())
            .collect()
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl SurfaceAdapter for RecordingSurface {
    async fn send_progress(&self, slot: &str, text: &str) -> Result<MessageRef, GenerationError> {
        if self.fail_send {
            return Err(GenerationError::presentation("channel not found"));
        }
        let sent = self
            .calls()
            .iter()
            .filter(|call| matches!(call, SurfaceCall::Send { .. }))
            .count();
        let message = format!("msg-{}", sent + 1);
        self.record(SurfaceCall::Send {
            slot: slot.to_string(),
            message: message.clone(),
            text: text.to_string(),
        });
        Ok(MessageRef(message))
    }

    async fn update_progress(
        &self,
        message: &MessageRef,
        text: &str,
    ) -> Result<(), GenerationError> {
        self.record(SurfaceCall::Update {
            message: message.0.clone(),
            text: text.to_string(),
        });
        if self.stall_updates {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn remove_progress(&self, message: &MessageRef) -> Result<(), GenerationError> {
        self.record(SurfaceCall::Remove {
            message: message.0.clone(),
        });
        Ok(())
    }

    async fn publish_result(
        &self,
        message: &MessageRef,
        content: &ResultContent,
        control: &RegenerateControl,
    ) -> Result<(), GenerationError> {
        if self.fail_publish {
            return Err(GenerationError::presentation("attachment rejected"));
        }
        self.record(SurfaceCall::Publish {
            message: message.0.clone(),
            artifacts: content.artifacts.len(),
            custom_id: control.custom_id(),
        });
        Ok(())
    }

    async fn publish_error(&self, message: &MessageRef, text: &str) -> Result<(), GenerationError> {
        self.record(SurfaceCall::Error {
            message: message.0.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}

pub(crate) fn context(
    provider: Arc<ScriptedProvider>,
    surface: Arc<RecordingSurface>,
    config: SessionConfig,
) -> Arc<SessionContext> {
    Arc::new(SessionContext {
        provider,
        surface,
        config,
        slots: Arc::new(SlotRegistry::new()),
        controls: Arc::new(ControlRegistry::new()),
        events: None,
    })
}
