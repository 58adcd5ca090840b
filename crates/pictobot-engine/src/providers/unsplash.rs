use async_trait::async_trait;
use pictobot_contracts::generation::{Artifact, Attribution, ProviderOutcome};
use pictobot_contracts::GenerationError;
use reqwest::header::AUTHORIZATION;
use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::http::{api_base_from_env, non_empty_env, response_json_or_error, send_error, str_at};
use crate::provider::{ProviderClient, ProviderHandle};

const NAME: &str = "unsplash";
const DEFAULT_API_BASE: &str = "https://api.unsplash.com";

/// Synchronous keyword search over Unsplash photos.
pub struct UnsplashProvider {
    api_base: String,
    access_key: String,
    per_page: u32,
    http: HttpClient,
}

impl UnsplashProvider {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self::with_api_base(
            api_base_from_env("UNSPLASH_API_BASE", DEFAULT_API_BASE),
            access_key,
        )
    }

    pub fn with_api_base(api_base: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_key: access_key.into(),
            per_page: 1,
            http: HttpClient::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        non_empty_env("UNSPLASH_ACCESS_KEY").map(Self::new)
    }

    fn artifacts_from_search(payload: &Value) -> Result<Vec<Artifact>, GenerationError> {
        let rows = payload
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| GenerationError::malformed(NAME, "search response missing results"))?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let url = str_at(row, "/urls/regular")?;
                Some(Artifact::from_url(
                    url,
                    Attribution {
                        provider: NAME.to_string(),
                        author: str_at(row, "/user/name").map(str::to_string),
                        page_url: str_at(row, "/links/html").map(str::to_string),
                    },
                ))
            })
            .collect())
    }
}

#[async_trait]
impl ProviderClient for UnsplashProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn submit(&self, prompt: &str) -> Result<ProviderHandle, GenerationError> {
        let endpoint = format!("{}/search/photos", self.api_base);
        let per_page = self.per_page.to_string();
        let response = self
            .http
            .get(&endpoint)
            .header(AUTHORIZATION, format!("Client-ID {}", self.access_key))
            .query(&[("query", prompt), ("per_page", per_page.as_str())])
            .send()
            .await
            .map_err(|err| send_error(NAME, &endpoint, err))?;
        let payload = response_json_or_error(NAME, response).await?;
        let artifacts = Self::artifacts_from_search(&payload)?;
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
