use async_trait::async_trait;
use pictobot_contracts::generation::{Artifact, Attribution, ProviderOutcome};
use pictobot_contracts::GenerationError;
use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::http::{api_base_from_env, non_empty_env, response_json_or_error, send_error, str_at};
use crate::provider::{ProviderClient, ProviderHandle};

const NAME: &str = "pixabay";
const DEFAULT_API_BASE: &str = "https://pixabay.com";
// Pixabay rejects per_page values below 3.
const PER_PAGE: &str = "3";

/// Synchronous keyword search over Pixabay; keeps the first hit.
pub struct PixabayProvider {
    api_base: String,
    api_key: String,
    http: HttpClient,
}

impl PixabayProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_api_base(
            api_base_from_env("PIXABAY_API_BASE", DEFAULT_API_BASE),
            api_key,
        )
    }

    pub fn with_api_base(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: HttpClient::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        non_empty_env("PIXABAY_API_KEY").map(Self::new)
    }

    fn artifacts_from_hits(payload: &Value) -> Result<Vec<Artifact>, GenerationError> {
        let hits = payload
            .get("hits")
            .and_then(Value::as_array)
            .ok_or_else(|| GenerationError::malformed(NAME, "search response missing hits"))?;
        Ok(hits
            .iter()
            .filter_map(|hit| {
                let url = str_at(hit, "/largeImageURL")?;
                Some(Artifact::from_url(
                    url,
                    Attribution {
                        provider: NAME.to_string(),
                        author: str_at(hit, "/user").map(str::to_string),
                        page_url: str_at(hit, "/pageURL").map(str::to_string),
                    },
                ))
            })
            .take(1)
            .collect())
    }
}

#[async_trait]
impl ProviderClient for PixabayProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn submit(&self, prompt: &str) -> Result<ProviderHandle, GenerationError> {
        let endpoint = format!("{}/api/", self.api_base);
        let response = self
            .http
            .get(&endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", prompt),
                ("image_type", "photo"),
                ("per_page", PER_PAGE),
            ])
            .send()
            .await
            .map_err(|err| send_error(NAME, &endpoint, err))?;
        let payload = response_json_or_error(NAME, response).await?;
        let artifacts = Self::artifacts_from_hits(&payload)?;
        Ok(ProviderHandle::Ready(ProviderOutcome::Succeeded(artifacts)))
    }

    async fn poll(&self, handle: &ProviderHandle) -> Result<ProviderOutcome, GenerationError> {
        match handle {
            ProviderHandle::Ready(outcome) => Ok(outcome.clone()),
            ProviderHandle::Job { id, .. } => Err(GenerationError::malformed(
                NAME,
                format!("search has no pollable job ({id})"),
            )),
        }
    }
}
