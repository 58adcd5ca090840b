use async_trait::async_trait;
use pictobot_contracts::generation::{Artifact, GenerationRequest};
use pictobot_contracts::GenerationError;

/// Opaque reference to one message on the chat surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef(pub String);

impl MessageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultContent {
    pub prompt: String,
    pub provider: String,
    pub artifacts: Vec<Artifact>,
}

/// Button attached to a final result; activating it re-runs the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerateControl {
    pub slot: String,
    pub label: String,
    custom_id: String,
    request: GenerationRequest,
}

impl RegenerateControl {
    pub(crate) fn new(slot: &str, custom_id: String, request: GenerationRequest) -> Self {
        Self {
            slot: slot.to_string(),
            label: "🔁 Regenerate".to_string(),
            custom_id,
            request,
        }
    }

    pub fn prompt(&self) -> &str {
        self.request.prompt()
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub fn custom_id(&self) -> String {
        self.custom_id.clone()
    }
}

/// Chat platform binding used by a session.
///
/// Every failure is reported as [`GenerationError::Presentation`].
#[async_trait]
pub trait SurfaceAdapter: Send + Sync {
    async fn send_progress(&self, slot: &str, text: &str) -> Result<MessageRef, GenerationError>;

    async fn update_progress(&self, message: &MessageRef, text: &str)
        -> Result<(), GenerationError>;

    async fn remove_progress(&self, message: &MessageRef) -> Result<(), GenerationError>;

    /// Replaces the progress message with the result in one user-visible step.
    async fn publish_result(
        &self,
        message: &MessageRef,
        content: &ResultContent,
        control: &RegenerateControl,
    ) -> Result<(), GenerationError>;

    async fn publish_error(&self, message: &MessageRef, text: &str) -> Result<(), GenerationError>;
}
