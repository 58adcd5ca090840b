use std::sync::Arc;
use std::time::Duration;

use pictobot_contracts::events::{EventDetails, EventScope, SessionEvent, SessionEventLog};
use pictobot_contracts::generation::{
    Artifact, CountdownState, GenerationRequest, ProviderOutcome, SessionState,
};
use pictobot_contracts::GenerationError;
use serde_json::{json, Value};
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::controls::ControlRegistry;
use crate::countdown::{CountdownConfig, CountdownPresenter, ZeroPolicy};
use crate::provider::{ProviderClient, ProviderHandle};
use crate::slots::{SessionTicket, SlotRegistry};
use crate::surface::{MessageRef, RegenerateControl, ResultContent, SurfaceAdapter};

/// Timing policy of a session.
///
/// The countdown shown to the user and the absolute timeout default to the
/// same duration, so the display reaches zero exactly when waiting ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub countdown_total: Duration,
    pub tick_interval: Duration,
    /// Falls back to the provider's own interval when `None`.
    pub poll_interval: Option<Duration>,
    pub timeout: Duration,
    pub zero_policy: ZeroPolicy,
}

impl SessionConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            countdown_total: timeout,
            timeout,
            ..Self::default()
        }
    }

    fn countdown(&self) -> CountdownConfig {
        CountdownConfig {
            total: self.countdown_total,
            tick: self.tick_interval,
            zero_policy: self.zero_policy,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_total: Duration::from_secs(30),
            tick_interval: Duration::from_secs(5),
            poll_interval: None,
            timeout: Duration::from_secs(30),
            zero_policy: ZeroPolicy::Stop,
        }
    }
}

/// Collaborators shared by every session of one bot.
pub struct SessionContext {
    pub provider: Arc<dyn ProviderClient>,
    pub surface: Arc<dyn SurfaceAdapter>,
    pub config: SessionConfig,
    pub slots: Arc<SlotRegistry>,
    pub controls: Arc<ControlRegistry>,
    pub events: Option<SessionEventLog>,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: u64,
    pub slot: String,
    pub request: GenerationRequest,
    pub state: SessionState,
    pub message: Option<MessageRef>,
    pub artifacts: Vec<Artifact>,
    pub error: Option<GenerationError>,
    /// Present only on `Done`.
    pub control: Option<RegenerateControl>,
    pub polls: u32,
    pub elapsed: Duration,
}

/// Mediates one generation attempt between provider and chat surface.
pub struct GenerationSession {
    ctx: Arc<SessionContext>,
    ticket: SessionTicket,
    request: GenerationRequest,
    scope: EventScope,
    state: SessionState,
    polls: u32,
    submitted_at: Option<Instant>,
}

impl GenerationSession {
    pub fn new(ctx: Arc<SessionContext>, ticket: SessionTicket, request: GenerationRequest) -> Self {
        let scope = EventScope {
            session_id: ticket.session_id(),
            slot: ticket.slot().to_string(),
            request_id: request.id().to_string(),
        };
        Self {
            ctx,
            ticket,
            request,
            scope,
            state: SessionState::Idle,
            polls: 0,
            submitted_at: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.ticket.session_id()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub async fn run(mut self) -> SessionReport {
        self.advance(SessionState::Submitting);
        self.emit(
            SessionEvent::Started,
            json!({
                "prompt": self.request.prompt(),
                "provider": self.ctx.provider.name(),
            }),
        );
        if !self.is_current() {
            return self.supersede(None).await;
        }

        let countdown = self.ctx.config.countdown().initial_state();
        let message = match self
            .ctx
            .surface
            .send_progress(self.ticket.slot(), &countdown.render(self.request.prompt()))
            .await
        {
            Ok(message) => message,
            Err(err) => {
                error!(session_id = self.id(), %err, "could not post progress message");
                self.advance(SessionState::Errored { kind: err.kind() });
                self.emit_failure(&err);
                self.ctx.slots.release(&self.ticket);
                return self.report(None, Vec::new(), Some(err));
            }
        };

        let mut presenter = self.start_countdown(&message);
        let token = self.ticket.superseded().clone();
        let submitted_at = Instant::now();
        self.submitted_at = Some(submitted_at);
        let deadline = submitted_at + self.ctx.config.timeout;
        let timeout = self.ctx.config.timeout;

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            waited = timeout_at(deadline, self.wait_for_artifacts()) => Some(
                waited.unwrap_or(Err(GenerationError::Timeout { after: timeout })),
            ),
        };

        // The timer stops before any final write to the message.
        presenter.cancel().await;

        let Some(result) = result else {
            return self.supersede(Some(message)).await;
        };
        if !self.is_current() {
            return self.supersede(Some(message)).await;
        }
        let report = match result {
            Ok(artifacts) => self.finalize(message, artifacts).await,
            Err(err) => self.fail(message, err).await,
        };
        self.ctx.slots.release(&self.ticket);
        report
    }

    fn start_countdown(&self, message: &MessageRef) -> CountdownPresenter {
        let surface = Arc::clone(&self.ctx.surface);
        let slots = Arc::clone(&self.ctx.slots);
        let slot = self.ticket.slot().to_string();
        let session_id = self.id();
        let message = message.clone();
        let prompt = self.request.prompt().to_string();

        let mut presenter = CountdownPresenter::new();
        let started = presenter.start(
            self.ctx.config.countdown(),
            move |state: CountdownState| {
                let surface = Arc::clone(&surface);
                let slots = Arc::clone(&slots);
                let slot = slot.clone();
                let message = message.clone();
                let text = state.render(&prompt);
                async move {
                    if !slots.is_current(&slot, session_id) {
                        return;
                    }
                    if let Err(err) = surface.update_progress(&message, &text).await {
                        warn!(session_id, %err, "countdown update failed");
                    }
                }
            },
            None,
        );
        if let Err(err) = started {
            warn!(session_id, %err, "countdown not started");
        }
        presenter
    }

    async fn wait_for_artifacts(&mut self) -> Result<Vec<Artifact>, GenerationError> {
        let provider = Arc::clone(&self.ctx.provider);
        let handle = provider.submit(self.request.prompt()).await?;
        let interval = self
            .ctx
            .config
            .poll_interval
            .unwrap_or_else(|| provider.poll_interval());

        let is_job = matches!(handle, ProviderHandle::Job { .. });
        if is_job {
            debug!(session_id = self.id(), job = handle.id(), "provider job submitted");
            self.advance(self.waiting());
        }

        loop {
            if is_job {
                sleep(interval).await;
            }
            let outcome = provider.poll(&handle).await?;
            self.polls += 1;
            match outcome {
                ProviderOutcome::Pending => {
                    debug!(session_id = self.id(), polls = self.polls, "provider still pending");
                    self.advance(self.waiting());
                    if !is_job {
                        sleep(interval).await;
                    }
                }
                ProviderOutcome::Succeeded(artifacts) if artifacts.is_empty() => {
                    return Err(GenerationError::EmptyResult {
                        provider: provider.name().to_string(),
                    });
                }
                ProviderOutcome::Succeeded(artifacts) => return Ok(artifacts),
                ProviderOutcome::Failed(reason) => {
                    return Err(GenerationError::ProviderFailure {
                        provider: provider.name().to_string(),
                        reason,
                    });
                }
            }
        }
    }

    async fn finalize(&mut self, message: MessageRef, artifacts: Vec<Artifact>) -> SessionReport {
        self.advance(SessionState::Finalizing);
        let content = ResultContent {
            prompt: self.request.prompt().to_string(),
            provider: self.ctx.provider.name().to_string(),
            artifacts,
        };
        let control = self.ctx.controls.issue(self.ticket.slot(), &self.request);

        match self
            .ctx
            .surface
            .publish_result(&message, &content, &control)
            .await
        {
            Ok(()) => {
                self.advance(SessionState::Done);
                info!(
                    session_id = self.id(),
                    artifacts = content.artifacts.len(),
                    polls = self.polls,
                    "generation published"
                );
                self.emit(
                    SessionEvent::Finished,
                    json!({
                        "state": "done",
                        "artifacts": content
                            .artifacts
                            .iter()
                            .map(Artifact::summary)
                            .collect::<Vec<Value>>(),
                    }),
                );
                let mut report = self.report(Some(message), content.artifacts, None);
                report.control = Some(control);
                report
            }
            Err(err) => {
                error!(session_id = self.id(), %err, "publishing result failed");
                if let Err(fallback) = self
                    .ctx
                    .surface
                    .publish_error(&message, err.user_message())
                    .await
                {
                    warn!(session_id = self.id(), %fallback, "fallback error notice failed");
                }
                self.advance(SessionState::Errored { kind: err.kind() });
                self.emit_failure(&err);
                self.report(Some(message), content.artifacts, Some(err))
            }
        }
    }

    async fn fail(&mut self, message: MessageRef, err: GenerationError) -> SessionReport {
        error!(session_id = self.id(), kind = err.kind().as_str(), %err, "generation failed");
        self.advance(SessionState::Errored { kind: err.kind() });
        if let Err(presentation) = self
            .ctx
            .surface
            .publish_error(&message, err.user_message())
            .await
        {
            warn!(session_id = self.id(), %presentation, "error notice failed");
        }
        self.emit_failure(&err);
        self.report(Some(message), Vec::new(), Some(err))
    }

    /// A newer session owns the slot: drop our own progress message and stop.
    async fn supersede(&mut self, message: Option<MessageRef>) -> SessionReport {
        self.advance(SessionState::Superseded);
        info!(session_id = self.id(), slot = self.ticket.slot(), "session superseded");
        if let Some(message) = &message {
            if let Err(err) = self.ctx.surface.remove_progress(message).await {
                debug!(session_id = self.id(), %err, "stale progress message not removed");
            }
        }
        self.emit(SessionEvent::Superseded, json!({}));
        self.report(message, Vec::new(), None)
    }

    fn is_current(&self) -> bool {
        self.ctx
            .slots
            .is_current(self.ticket.slot(), self.ticket.session_id())
    }

    fn waiting(&self) -> SessionState {
        SessionState::Waiting {
            elapsed: self.elapsed(),
            polls: self.polls,
        }
    }

    fn elapsed(&self) -> Duration {
        self.submitted_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    fn advance(&mut self, next: SessionState) {
        if !self.state.can_advance_to(&next) {
            warn!(
                session_id = self.id(),
                from = self.state.name(),
                to = next.name(),
                "ignoring illegal session transition"
            );
            return;
        }
        if next.name() != self.state.name() {
            debug!(session_id = self.id(), state = next.name(), "session state");
            self.emit(
                SessionEvent::StateChanged,
                serde_json::to_value(&next).unwrap_or(Value::Null),
            );
        }
        self.state = next;
    }

    fn emit_failure(&self, err: &GenerationError) {
        self.emit(
            SessionEvent::Finished,
            json!({
                "state": "errored",
                "error_kind": err.kind().as_str(),
                "error": err.to_string(),
            }),
        );
    }

    fn emit(&self, event: SessionEvent, details: Value) {
        let Some(events) = &self.ctx.events else {
            return;
        };
        let details = match details {
            Value::Object(map) => map,
            _ => EventDetails::new(),
        };
        if let Err(err) = events.record(&self.scope, event, details) {
            warn!(%err, event = event.as_str(), "event log write failed");
        }
    }

    fn report(
        &self,
        message: Option<MessageRef>,
        artifacts: Vec<Artifact>,
        error: Option<GenerationError>,
    ) -> SessionReport {
        SessionReport {
            session_id: self.id(),
            slot: self.ticket.slot().to_string(),
            request: self.request.clone(),
            state: self.state.clone(),
            message,
            artifacts,
            error,
            control: None,
            polls: self.polls,
            elapsed: self.elapsed(),
        }
    }
}
