use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Url(String),
    Bytes {
        bytes: Vec<u8>,
        mime_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attribution {
    pub provider: String,
    pub author: Option<String>,
    pub page_url: Option<String>,
}

/// One generated or found image plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub source: ArtifactSource,
    pub attribution: Attribution,
}

impl Artifact {
    pub fn from_url(url: impl Into<String>, attribution: Attribution) -> Self {
        Self {
            source: ArtifactSource::Url(url.into()),
            attribution,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, mime_type: Option<String>, attribution: Attribution) -> Self {
        Self {
            source: ArtifactSource::Bytes { bytes, mime_type },
            attribution,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.source {
            ArtifactSource::Url(url) => Some(url.as_str()),
            ArtifactSource::Bytes { .. } => None,
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match &self.source {
            ArtifactSource::Bytes { mime_type, .. } => {
                extension_for_mime(mime_type.as_deref().unwrap_or_default())
            }
            ArtifactSource::Url(raw) => url::Url::parse(raw)
                .ok()
                .and_then(|parsed| {
                    parsed
                        .path()
                        .rsplit('.')
                        .next()
                        .map(|ext| ext.to_ascii_lowercase())
                })
                .map(|ext| extension_for_suffix(&ext))
                .unwrap_or("png"),
        }
    }

    /// Log-safe description; byte payloads are reduced to their length.
    pub fn summary(&self) -> Value {
        let source = match &self.source {
            ArtifactSource::Url(url) => json!({ "url": url }),
            ArtifactSource::Bytes { bytes, mime_type } => json!({
                "bytes": bytes.len(),
                "mime_type": mime_type,
            }),
        };
        json!({
            "source": source,
            "provider": self.attribution.provider,
            "author": self.attribution.author,
            "page_url": self.attribution.page_url,
        })
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

fn extension_for_suffix(suffix: &str) -> &'static str {
    match suffix {
        "jpg" | "jpeg" => "jpg",
        "webp" => "webp",
        "gif" => "gif",
        _ => "png",
    }
}

/// Normalised answer of a provider poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Pending,
    Succeeded(Vec<Artifact>),
    Failed(String),
}

impl ProviderOutcome {
    /// Collapses raw provider signals into one outcome.
    ///
    /// A provider that claims success and failure at once is treated as
    /// succeeded when it delivered artifacts, failed otherwise.
    pub fn from_signals(
        succeeded: bool,
        failure: Option<String>,
        artifacts: Vec<Artifact>,
    ) -> Self {
        match (succeeded, failure) {
            (true, None) => ProviderOutcome::Succeeded(artifacts),
            (true, Some(_)) if !artifacts.is_empty() => ProviderOutcome::Succeeded(artifacts),
            (_, Some(reason)) => ProviderOutcome::Failed(reason),
            (false, None) => ProviderOutcome::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProviderOutcome::Pending)
    }
}
