use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GenerationError;

/// One generation attempt. A regenerate is a new request with the same prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    id: String,
    prompt: String,
    created_at: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn new(prompt: &str) -> Result<Self, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::InvalidInput);
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            prompt: prompt.to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn regenerate(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            prompt: self.prompt.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
