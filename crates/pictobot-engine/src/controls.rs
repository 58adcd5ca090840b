use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pictobot_contracts::chat::ControlId;
use pictobot_contracts::generation::GenerationRequest;
use sha2::{Digest, Sha256};

use crate::surface::RegenerateControl;

const KEY_HEX_CHARS: usize = 24;

/// Issues regenerate buttons and maps their ids back to requests.
///
/// Prompts too long for an inline id are remembered under a digest key.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    stored: Mutex<HashMap<String, GenerationRequest>>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, slot: &str, request: &GenerationRequest) -> RegenerateControl {
        let id = ControlId::inline(request.prompt()).unwrap_or_else(|| {
            let key = prompt_key(request.prompt());
            self.lock().insert(key.clone(), request.clone());
            ControlId::stored(key)
        });
        RegenerateControl::new(slot, id.encode(), request.clone())
    }

    pub fn stored(&self, key: &str) -> Option<GenerationRequest> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, GenerationRequest>> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prompt_key(prompt: &str) -> String {
    let digest = hex::encode(Sha256::digest(prompt.as_bytes()));
    digest[..KEY_HEX_CHARS].to_string()
}
