pub mod chat;
pub mod error;
pub mod events;
pub mod generation;

pub use error::{ErrorKind, GenerationError};
