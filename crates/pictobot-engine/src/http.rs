use std::env;

use pictobot_contracts::GenerationError;
use reqwest::Response;
use serde_json::Value;

const ERROR_BODY_MAX_CHARS: usize = 512;

pub(crate) async fn response_json_or_error(
    provider: &str,
    response: Response,
) -> Result<Value, GenerationError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| GenerationError::transport(provider, error_chain_text(&err)))?;
    if !status.is_success() {
        return Err(GenerationError::HttpStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: truncate_text(&body, ERROR_BODY_MAX_CHARS),
        });
    }
    serde_json::from_str(&body)
        .map_err(|err| GenerationError::malformed(provider, format!("invalid JSON payload: {err}")))
}

pub(crate) fn send_error(provider: &str, endpoint: &str, err: reqwest::Error) -> GenerationError {
    GenerationError::transport(provider, format!("{endpoint}: {}", error_chain_text(&err)))
}

fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = cause {
        let text = current.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty() && parts.last().map(String::as_str) != Some(trimmed) {
            parts.push(trimmed.to_string());
        }
        cause = current.source();
    }
    truncate_text(&parts.join(" | caused by: "), ERROR_BODY_MAX_CHARS)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn api_base_from_env(key: &str, default: &str) -> String {
    non_empty_env(key)
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
