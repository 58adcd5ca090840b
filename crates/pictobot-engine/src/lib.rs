//! Async generation core: providers, countdown, sessions and the slot arena.

pub mod controls;
pub mod countdown;
pub mod generator;
mod http;
pub mod provider;
pub mod providers;
pub mod session;
pub mod slots;
pub mod surface;

#[cfg(test)]
mod test_support;

pub use controls::ControlRegistry;
pub use countdown::{CountdownConfig, CountdownError, CountdownPresenter, ZeroPolicy};
pub use generator::{Generator, SessionHandle};
pub use provider::{ProviderClient, ProviderHandle, ProviderRegistry, DEFAULT_POLL_INTERVAL};
pub use providers::default_provider_registry;
pub use session::{GenerationSession, SessionConfig, SessionContext, SessionReport};
pub use slots::{SessionTicket, SlotRegistry};
pub use surface::{MessageRef, RegenerateControl, ResultContent, SurfaceAdapter};
