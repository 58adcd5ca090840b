use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use pictobot_contracts::generation::{Artifact, Attribution, ProviderOutcome};
use pictobot_contracts::GenerationError;
use sha2::{Digest, Sha256};

use crate::provider::{ProviderClient, ProviderHandle};

const NAME: &str = "dryrun";
const IMAGE_SIDE: u32 = 64;

/// Offline provider: renders a solid colour derived from the prompt after a
/// fixed number of pending polls.
pub struct DryrunProvider {
    pending_polls: u32,
    artifact_count: usize,
    next_job: AtomicU64,
    jobs: Mutex<HashMap<String, DryrunJob>>,
}

#[derive(Debug, Clone)]
struct DryrunJob {
    prompt: String,
    polls_left: u32,
}

impl DryrunProvider {
    pub fn new(pending_polls: u32, artifact_count: usize) -> Self {
        Self {
            pending_polls,
            artifact_count,
            next_job: AtomicU64::new(1),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn render(prompt: &str, index: usize) -> Result<Artifact, GenerationError> {
        let (r, g, b) = color_from_prompt(prompt, index as u64);
        let image = RgbImage::from_pixel(IMAGE_SIDE, IMAGE_SIDE, Rgb([r, g, b]));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|err| GenerationError::ProviderFailure {
                provider: NAME.to_string(),
                reason: format!("png encode failed: {err}"),
            })?;
        Ok(Artifact::from_bytes(
            bytes.into_inner(),
            Some("image/png".to_string()),
            Attribution {
                provider: NAME.to_string(),
                author: Some(format!("dryrun-{}", short_id(prompt, index as u64))),
                page_url: None,
            },
        ))
    }

    fn complete(&self, prompt: &str) -> Result<ProviderOutcome, GenerationError> {
        let artifacts = (0..self.artifact_count)
            .map(|index| Self::render(prompt, index))
            .collect::<Result<Vec<Artifact>, GenerationError>>()?;
        Ok(ProviderOutcome::Succeeded(artifacts))
    }
}

impl Default for DryrunProvider {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

#[async_trait]
impl ProviderClient for DryrunProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn submit(&self, prompt: &str) -> Result<ProviderHandle, GenerationError> {
        if self.pending_polls == 0 {
            return Ok(ProviderHandle::Ready(self.complete(prompt)?));
        }
        let id = format!("dry-{}", self.next_job.fetch_add(1, Ordering::Relaxed));
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| GenerationError::transport(NAME, "job table lock poisoned"))?;
        jobs.insert(
            id.clone(),
            DryrunJob {
                prompt: prompt.to_string(),
                polls_left: self.pending_polls,
            },
        );
        Ok(ProviderHandle::Job {
            status_url: format!("dryrun://jobs/{id}"),
            id,
        })
    }

    async fn poll(&self, handle: &ProviderHandle) -> Result<ProviderOutcome, GenerationError> {
        let id = match handle {
            ProviderHandle::Ready(outcome) => return Ok(outcome.clone()),
            ProviderHandle::Job { id, .. } => id,
        };
        let prompt = {
            let mut jobs = self
                .jobs
                .lock()
                .map_err(|_| GenerationError::transport(NAME, "job table lock poisoned"))?;
            let job = jobs
                .get_mut(id)
                .ok_or_else(|| GenerationError::malformed(NAME, format!("unknown job {id}")))?;
            if job.polls_left > 0 {
                job.polls_left -= 1;
                return Ok(ProviderOutcome::Pending);
            }
            let prompt = job.prompt.clone();
            jobs.remove(id);
            prompt
        };
        self.complete(&prompt)
    }
}

fn color_from_prompt(prompt: &str, seed: u64) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(seed.to_be_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn short_id(prompt: &str, idx: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(idx.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use pictobot_contracts::generation::{ArtifactSource, ProviderOutcome};

    use super::{color_from_prompt, DryrunProvider};
    use crate::provider::{ProviderClient, ProviderHandle};

    #[tokio::test]
    async fn pending_polls_then_png_artifacts() -> anyhow::Result<()> {
        let provider = DryrunProvider::new(2, 2);
        let handle = provider.submit("boat").await?;
        assert_eq!(provider.poll(&handle).await?, ProviderOutcome::Pending);
        assert_eq!(provider.poll(&handle).await?, ProviderOutcome::Pending);

        let ProviderOutcome::Succeeded(artifacts) = provider.poll(&handle).await? else {
            panic!("expected success after pending polls");
        };
        assert_eq!(artifacts.len(), 2);
        let ArtifactSource::Bytes { bytes, mime_type } = &artifacts[0].source else {
            panic!("dryrun artifacts are byte blobs");
        };
        assert_eq!(mime_type.as_deref(), Some("image/png"));
        assert_eq!(&bytes[1..4], b"PNG");
        Ok(())
    }

    #[tokio::test]
    async fn submits_are_independent() -> anyhow::Result<()> {
        let provider = DryrunProvider::new(1, 1);
        let first = provider.submit("boat").await?;
        let second = provider.submit("boat").await?;
        assert_ne!(first, second);

        assert_eq!(provider.poll(&first).await?, ProviderOutcome::Pending);
        assert!(provider.poll(&first).await?.is_terminal());
        assert_eq!(provider.poll(&second).await?, ProviderOutcome::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn zero_pending_polls_resolves_in_submit() -> anyhow::Result<()> {
        let provider = DryrunProvider::new(0, 1);
        let handle = provider.submit("boat").await?;
        assert!(matches!(handle, ProviderHandle::Ready(ProviderOutcome::Succeeded(_))));
        Ok(())
    }

    #[test]
    fn colour_is_stable_per_prompt() {
        assert_eq!(color_from_prompt("boat", 0), color_from_prompt("boat", 0));
        assert_ne!(color_from_prompt("boat", 0), color_from_prompt("boat", 1));
    }
}
