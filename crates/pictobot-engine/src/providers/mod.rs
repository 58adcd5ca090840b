mod dryrun;
mod pixabay;
mod replicate;
mod unsplash;

pub use dryrun::DryrunProvider;
pub use pixabay::PixabayProvider;
pub use replicate::ReplicateProvider;
pub use unsplash::UnsplashProvider;

use crate::provider::ProviderRegistry;

/// Registers dryrun plus every remote provider whose credentials are present
/// in the environment.
pub fn default_provider_registry() -> ProviderRegistry {
    let mut providers = ProviderRegistry::new();
    providers.register(DryrunProvider::default());
    if let Some(provider) = ReplicateProvider::from_env() {
        providers.register(provider);
    }
    if let Some(provider) = UnsplashProvider::from_env() {
        providers.register(provider);
    }
    if let Some(provider) = PixabayProvider::from_env() {
        providers.register(provider);
    }
    providers
}
