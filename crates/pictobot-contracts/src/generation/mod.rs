mod countdown;
mod outcome;
mod request;
mod state;

pub use countdown::CountdownState;
pub use outcome::{Artifact, ArtifactSource, Attribution, ProviderOutcome};
pub use request::GenerationRequest;
pub use state::SessionState;
