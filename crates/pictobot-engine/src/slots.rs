use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Proof of ownership of a reply slot, held by exactly one session.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    slot: String,
    session_id: u64,
    token: CancellationToken,
}

impl SessionTicket {
    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Cancelled as soon as another session claims the same slot.
    pub fn superseded(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug)]
struct SlotEntry {
    session_id: u64,
    token: CancellationToken,
}

/// Arena of reply slots with a generation counter.
///
/// Every claim gets a fresh, monotonically increasing session id. Callbacks
/// compare their captured id with the slot's current id before writing.
#[derive(Debug, Default)]
pub struct SlotRegistry {
    next_id: AtomicU64,
    slots: Mutex<HashMap<String, SlotEntry>>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, slot: &str) -> SessionTicket {
        let session_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let previous = self.lock().insert(
            slot.to_string(),
            SlotEntry {
                session_id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        SessionTicket {
            slot: slot.to_string(),
            session_id,
            token,
        }
    }

    pub fn is_current(&self, slot: &str, session_id: u64) -> bool {
        self.current(slot) == Some(session_id)
    }

    pub fn current(&self, slot: &str) -> Option<u64> {
        self.lock().get(slot).map(|entry| entry.session_id)
    }

    /// Frees the slot unless a newer session already owns it.
    pub fn release(&self, ticket: &SessionTicket) {
        let mut slots = self.lock();
        if slots
            .get(&ticket.slot)
            .map(|entry| entry.session_id == ticket.session_id)
            .unwrap_or(false)
        {
            slots.remove(&ticket.slot);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SlotEntry>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
