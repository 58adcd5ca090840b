use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pictobot_contracts::generation::ProviderOutcome;
use pictobot_contracts::GenerationError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Token returned by [`ProviderClient::submit`].
///
/// Synchronous providers do their single call inside `submit` and hand back
/// `Ready`; asynchronous ones hand back a `Job` whose status endpoint is
/// polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderHandle {
    Ready(ProviderOutcome),
    Job { id: String, status_url: String },
}

impl ProviderHandle {
    pub fn id(&self) -> &str {
        match self {
            ProviderHandle::Ready(_) => "ready",
            ProviderHandle::Job { id, .. } => id.as_str(),
        }
    }
}

/// Capability interface over one image generation or search backend.
///
/// Each `submit` yields an independent handle; calling it twice never
/// shares state between the two attempts.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> &str;

    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    async fn submit(&self, prompt: &str) -> Result<ProviderHandle, GenerationError>;

    async fn poll(&self, handle: &ProviderHandle) -> Result<ProviderOutcome, GenerationError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: ProviderClient + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Arc::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProviderClient>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}
