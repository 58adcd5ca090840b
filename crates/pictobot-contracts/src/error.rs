use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Coarse error classes surfaced to the chat user.
///
/// Several [`GenerationError`] variants share a kind: a non-2xx status and a
/// malformed body are both transport problems to the user, but stay distinct
/// variants so logs and tests can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    TransportError,
    ProviderFailure,
    EmptyResult,
    Timeout,
    PresentationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::ProviderFailure => "provider_failure",
            ErrorKind::EmptyResult => "empty_result",
            ErrorKind::Timeout => "timeout",
            ErrorKind::PresentationError => "presentation_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("prompt is empty")]
    InvalidInput,

    #[error("{provider} request failed: {detail}")]
    Transport { provider: String, detail: String },

    #[error("{provider} request failed ({status}): {body}")]
    HttpStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} returned a malformed response: {detail}")]
    MalformedResponse { provider: String, detail: String },

    #[error("{provider} reported failure: {reason}")]
    ProviderFailure { provider: String, reason: String },

    #[error("{provider} returned no artifacts")]
    EmptyResult { provider: String },

    #[error("generation timed out after {:.1}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    #[error("chat surface update failed: {detail}")]
    Presentation { detail: String },
}

impl GenerationError {
    pub fn transport(provider: &str, detail: impl Into<String>) -> Self {
        GenerationError::Transport {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    pub fn malformed(provider: &str, detail: impl Into<String>) -> Self {
        GenerationError::MalformedResponse {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    pub fn presentation(detail: impl Into<String>) -> Self {
        GenerationError::Presentation {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::InvalidInput => ErrorKind::InvalidInput,
            GenerationError::Transport { .. }
            | GenerationError::HttpStatus { .. }
            | GenerationError::MalformedResponse { .. } => ErrorKind::TransportError,
            GenerationError::ProviderFailure { .. } => ErrorKind::ProviderFailure,
            GenerationError::EmptyResult { .. } => ErrorKind::EmptyResult,
            GenerationError::Timeout { .. } => ErrorKind::Timeout,
            GenerationError::Presentation { .. } => ErrorKind::PresentationError,
        }
    }

    /// Text shown in the chat. Technical detail stays in the logs.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidInput => "❌ empty prompt, type something to generate.",
            ErrorKind::TransportError => "❌ Error while calling the image API.",
            ErrorKind::ProviderFailure => "❌ Generation failed.",
            ErrorKind::EmptyResult => "❌ no result found.",
            ErrorKind::Timeout => "❌ Generation timed out.",
            ErrorKind::PresentationError => "❌ Could not display the result.",
        }
    }
}
