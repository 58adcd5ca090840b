use std::sync::Arc;

use pictobot_contracts::chat::ControlId;
use pictobot_contracts::events::SessionEventLog;
use pictobot_contracts::generation::GenerationRequest;
use pictobot_contracts::GenerationError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::controls::ControlRegistry;
use crate::provider::ProviderClient;
use crate::session::{GenerationSession, SessionConfig, SessionContext, SessionReport};
use crate::slots::SlotRegistry;
use crate::surface::{RegenerateControl, SurfaceAdapter};

/// Entry point for chat handlers: validates prompts and launches sessions.
#[derive(Clone)]
pub struct Generator {
    ctx: Arc<SessionContext>,
}

/// A spawned session.
pub struct SessionHandle {
    session_id: u64,
    join: JoinHandle<SessionReport>,
}

impl SessionHandle {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn wait(self) -> anyhow::Result<SessionReport> {
        Ok(self.join.await?)
    }
}

impl Generator {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        surface: Arc<dyn SurfaceAdapter>,
        config: SessionConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(SessionContext {
                provider,
                surface,
                config,
                slots: Arc::new(SlotRegistry::new()),
                controls: Arc::new(ControlRegistry::new()),
                events: None,
            }),
        }
    }

    pub fn with_events(self, events: SessionEventLog) -> Self {
        self.rebuild(|ctx| ctx.events = Some(events))
    }

    /// Same slots and surface, different backend. Sessions already running
    /// keep the provider they started with.
    pub fn with_provider(&self, provider: Arc<dyn ProviderClient>) -> Self {
        self.clone().rebuild(|ctx| ctx.provider = provider)
    }

    pub fn provider_name(&self) -> &str {
        self.ctx.provider.name()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.ctx.config
    }

    pub fn slots(&self) -> &SlotRegistry {
        &self.ctx.slots
    }

    /// Validates `prompt`, claims `slot` and spawns the session.
    ///
    /// An empty prompt fails here and no session, message or provider call
    /// is created.
    pub fn start(&self, slot: &str, prompt: &str) -> Result<SessionHandle, GenerationError> {
        Ok(self.spawn(slot, GenerationRequest::new(prompt)?))
    }

    /// New request for the control's prompt, on the control's slot. Any
    /// session still running there is superseded.
    pub fn regenerate(&self, control: &RegenerateControl) -> SessionHandle {
        self.spawn(&control.slot, control.request().regenerate())
    }

    /// Starts a session from a button's custom id.
    pub fn handle_control(
        &self,
        slot: &str,
        custom_id: &str,
    ) -> Result<SessionHandle, GenerationError> {
        match ControlId::parse(custom_id) {
            Some(ControlId::Generate { prompt }) => self.start(slot, &prompt),
            Some(ControlId::Stored { key }) => match self.ctx.controls.stored(&key) {
                Some(request) => Ok(self.spawn(slot, request.regenerate())),
                None => {
                    warn!(slot, custom_id, "control id refers to an unknown prompt");
                    Err(GenerationError::InvalidInput)
                }
            },
            None => {
                warn!(slot, custom_id, "unrecognised control id");
                Err(GenerationError::InvalidInput)
            }
        }
    }

    /// Runs one session on the current task.
    pub async fn run(&self, slot: &str, prompt: &str) -> Result<SessionReport, GenerationError> {
        let request = GenerationRequest::new(prompt)?;
        Ok(self.prepare(slot, request).run().await)
    }

    fn spawn(&self, slot: &str, request: GenerationRequest) -> SessionHandle {
        let session = self.prepare(slot, request);
        let session_id = session.id();
        info!(session_id, slot, prompt = session.request().prompt(), "session starting");
        SessionHandle {
            session_id,
            join: tokio::spawn(session.run()),
        }
    }

    fn prepare(&self, slot: &str, request: GenerationRequest) -> GenerationSession {
        let ticket = self.ctx.slots.claim(slot);
        GenerationSession::new(Arc::clone(&self.ctx), ticket, request)
    }

    fn rebuild(self, change: impl FnOnce(&mut SessionContext)) -> Self {
        let mut ctx = SessionContext {
            provider: Arc::clone(&self.ctx.provider),
            surface: Arc::clone(&self.ctx.surface),
            config: self.ctx.config,
            slots: Arc::clone(&self.ctx.slots),
            controls: Arc::clone(&self.ctx.controls),
            events: self.ctx.events.clone(),
        };
        change(&mut ctx);
        Self { ctx: Arc::new(ctx) }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pictobot_contracts::generation::{ProviderOutcome, SessionState};
    use pictobot_contracts::GenerationError;
    use pretty_assertions::assert_eq;

    use super::Generator;
    use crate::provider::ProviderClient;
    use crate::session::SessionConfig;
    use crate::surface::SurfaceAdapter;
    use crate::test_support::{artifacts, RecordingSurface, Script, ScriptedProvider, SurfaceCall};

    fn generator(script: Script) -> (Generator, Arc<ScriptedProvider>, Arc<RecordingSurface>) {
        let provider = Arc::new(ScriptedProvider::new(script));
        let surface = Arc::new(RecordingSurface::default());
        let generator = Generator::new(
            Arc::clone(&provider) as Arc<dyn ProviderClient>,
            Arc::clone(&surface) as Arc<dyn SurfaceAdapter>,
            SessionConfig::default(),
        );
        (generator, provider, surface)
    }

    #[tokio::test(start_paused = true)]
    async fn empty_prompt_starts_nothing() {
        let (generator, provider, surface) = generator(Script::Never);

        let err = generator.start("chan-1", "   ").err();

        assert_eq!(err, Some(GenerationError::InvalidInput));
        tokio::task::yield_now().await;
        assert_eq!(provider.submits(), 0);
        assert!(surface.calls().is_empty());
        assert_eq!(generator.slots().current("chan-1"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn regenerate_reuses_prompt_on_control_slot() -> anyhow::Result<()> {
        let (generator, provider, surface) = generator(Script::Ready {
            delay: Duration::from_secs(1),
            outcome: ProviderOutcome::Succeeded(artifacts(1)),
        });

        let first = generator.run("chan-1", "cat").await?;
        assert_eq!(first.state, SessionState::Done);

        let control = first.control.clone().expect("done sessions carry a control");
        let second = generator.regenerate(&control).wait().await?;

        assert_eq!(second.state, SessionState::Done);
        assert_eq!(second.request.prompt(), "cat");
        assert_ne!(second.request.id(), first.request.id());
        assert_eq!(provider.submits(), 2);
        let published = surface
            .calls()
            .into_iter()
            .filter(|call| matches!(call, SurfaceCall::Publish { .. }))
            .count();
        assert_eq!(published, 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn control_ids_are_decoded() -> anyhow::Result<()> {
        let (generator, _provider, _surface) = generator(Script::Ready {
            delay: Duration::from_millis(10),
            outcome: ProviderOutcome::Succeeded(artifacts(1)),
        });

        let report = generator
            .handle_control("chan-2", "generate_snake_case")?
            .wait()
            .await?;
        assert_eq!(report.request.prompt(), "snake_case");
        assert_eq!(report.slot, "chan-2");

        assert_eq!(
            generator.handle_control("chan-2", "delete_all").err(),
            Some(GenerationError::InvalidInput)
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn long_prompt_survives_a_button_click() -> anyhow::Result<()> {
        let (generator, _provider, _surface) = generator(Script::Ready {
            delay: Duration::from_millis(10),
            outcome: ProviderOutcome::Succeeded(artifacts(1)),
        });
        let long = "an isometric pixel-art harbour town at night, lanterns, fog, \
                    fishing boats, a lighthouse beam sweeping over the water";
        assert!(long.chars().count() > 100);

        let first = generator.run("chan-1", long).await?;
        let custom_id = first.control.map(|control| control.custom_id()).unwrap_or_default();
        assert!(custom_id.starts_with("stored_"));

        let again = generator.handle_control("chan-1", &custom_id)?.wait().await?;
        assert_eq!(again.state, SessionState::Done);
        assert_eq!(again.request.prompt(), long);
        assert_ne!(again.request.id(), first.request.id());

        assert_eq!(
            generator.handle_control("chan-1", "stored_ffffffff").err(),
            Some(GenerationError::InvalidInput)
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn prompts_on_separate_slots_both_finish() -> anyhow::Result<()> {
        let (generator, _provider, surface) = generator(Script::Job {
            pending: 2,
            outcome: ProviderOutcome::Succeeded(artifacts(1)),
        });

        let cat = generator.start("chan-1/1", "cat")?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let dog = generator.start("chan-1/2", "dog")?;

        assert_eq!(cat.wait().await?.state, SessionState::Done);
        assert_eq!(dog.wait().await?.state, SessionState::Done);
        let published = surface
            .calls()
            .into_iter()
            .filter(|call| matches!(call, SurfaceCall::Publish { .. }))
            .count();
        assert_eq!(published, 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_regenerate_leaves_one_result() -> anyhow::Result<()> {
        let (generator, _provider, surface) = generator(Script::Job {
            pending: 2,
            outcome: ProviderOutcome::Succeeded(artifacts(1)),
        });

        let first = generator.start("chan-1", "cat")?;
        let second = generator.start("chan-1", "cat")?;
        assert!(second.session_id() > first.session_id());

        let first = first.wait().await?;
        let second = second.wait().await?;
        assert_eq!(first.state, SessionState::Superseded);
        assert_eq!(second.state, SessionState::Done);
        let published: Vec<SurfaceCall> = surface
            .calls()
            .into_iter()
            .filter(|call| matches!(call, SurfaceCall::Publish { .. }))
            .collect();
        assert_eq!(published.len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn with_provider_shares_slots() {
        let (generator, _provider, _surface) = generator(Script::Never);
        let other = generator.with_provider(Arc::new(ScriptedProvider::new(Script::Never)));

        let ticket = other.slots().claim("chan-1");
        assert!(generator.slots().is_current("chan-1", ticket.session_id()));
        assert_eq!(other.provider_name(), "scripted");
    }
}
