use async_trait::async_trait;
use pictobot_contracts::generation::{Artifact, Attribution, ProviderOutcome};
use pictobot_contracts::GenerationError;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tracing::debug;

use crate::http::{api_base_from_env, non_empty_env, response_json_or_error, send_error, str_at};
use crate::provider::{ProviderClient, ProviderHandle};

const NAME: &str = "replicate";
const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
const DEFAULT_MODEL_VERSION: &str = "stability-ai/stable-diffusion:latest";

/// Asynchronous provider: submit a prediction, then poll its `urls.get`.
pub struct ReplicateProvider {
    api_base: String,
    api_token: String,
    model_version: String,
    http: HttpClient,
}

impl ReplicateProvider {
    pub fn new(api_token: impl Into<String>, model_version: Option<String>) -> Self {
        Self::with_api_base(
            api_base_from_env("REPLICATE_API_BASE", DEFAULT_API_BASE),
            api_token,
            model_version,
        )
    }

    pub fn with_api_base(
        api_base: impl Into<String>,
        api_token: impl Into<String>,
        model_version: Option<String>,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            model_version: model_version
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string()),
            http: HttpClient::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        let token =
            non_empty_env("REPLICATE_API_TOKEN").or_else(|| non_empty_env("REPLICATE_API_KEY"))?;
        Some(Self::new(token, non_empty_env("REPLICATE_MODEL_VERSION")))
    }

    fn predictions_endpoint(&self) -> String {
        format!("{}/predictions", self.api_base)
    }

    fn extract_output_urls(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(url) => {
                let trimmed = url.trim();
                if trimmed.starts_with("http") && !out.iter().any(|existing| existing == trimmed) {
                    out.push(trimmed.to_string());
                }
            }
            Value::Array(rows) => {
                for row in rows {
                    Self::extract_output_urls(row, out);
                }
            }
            Value::Object(obj) => {
                for key in ["url", "urls", "output"] {
                    if let Some(nested) = obj.get(key) {
                        Self::extract_output_urls(nested, out);
                    }
                }
            }
            _ => {}
        }
    }

    fn outcome_from_prediction(prediction: &Value) -> Result<ProviderOutcome, GenerationError> {
        let status = str_at(prediction, "/status")
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| GenerationError::malformed(NAME, "prediction missing status"))?;
        let error = str_at(prediction, "/error").map(str::to_string);

        match status.as_str() {
            "starting" | "processing" => Ok(ProviderOutcome::Pending),
            "succeeded" => {
                let mut urls = Vec::new();
                if let Some(output) = prediction.get("output") {
                    Self::extract_output_urls(output, &mut urls);
                }
                let attribution = Attribution {
                    provider: NAME.to_string(),
                    author: None,
                    page_url: str_at(prediction, "/urls/web").map(str::to_string),
                };
                let artifacts = urls
                    .into_iter()
                    .map(|url| Artifact::from_url(url, attribution.clone()))
                    .collect();
                Ok(ProviderOutcome::from_signals(true, error, artifacts))
            }
            "failed" | "canceled" => Ok(ProviderOutcome::Failed(
                error.unwrap_or_else(|| format!("prediction {status}")),
            )),
            other => Err(GenerationError::malformed(
                NAME,
                format!("unknown prediction status '{other}'"),
            )),
        }
    }
}

#[async_trait]
impl ProviderClient for ReplicateProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn submit(&self, prompt: &str) -> Result<ProviderHandle, GenerationError> {
        let endpoint = self.predictions_endpoint();
        let payload = json!({
            "version": self.model_version,
            "input": { "prompt": prompt },
        });
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| send_error(NAME, &endpoint, err))?;
        let prediction = response_json_or_error(NAME, response).await?;

        let outcome = Self::outcome_from_prediction(&prediction)?;
        if outcome.is_terminal() {
            return Ok(ProviderHandle::Ready(outcome));
        }
        let status_url = str_at(&prediction, "/urls/get")
            .ok_or_else(|| GenerationError::malformed(NAME, "prediction missing poll URL"))?;
        let id = str_at(&prediction, "/id").unwrap_or("unknown");
        debug!(prediction_id = id, "replicate prediction submitted");
        Ok(ProviderHandle::Job {
            id: id.to_string(),
            status_url: status_url.to_string(),
        })
    }

    async fn poll(&self, handle: &ProviderHandle) -> Result<ProviderOutcome, GenerationError> {
        let status_url = match handle {
            ProviderHandle::Ready(outcome) => return Ok(outcome.clone()),
            ProviderHandle::Job { status_url, .. } => status_url,
        };
        let response = self
            .http
            .get(status_url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|err| send_error(NAME, status_url, err))?;
        let prediction = response_json_or_error(NAME, response).await?;
        Self::outcome_from_prediction(&prediction)
    }
}
