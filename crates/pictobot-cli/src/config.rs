use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use pictobot_engine::{ProviderRegistry, SessionConfig};

/// Flags shared by `chat` and `run`. Every flag falls back to the
/// environment, which `.env` may populate.
#[derive(Debug, Clone, Args)]
pub struct BotArgs {
    #[arg(long, env = "PICTOBOT_PROVIDER", default_value = "dryrun")]
    pub provider: String,
    #[arg(long, env = "PICTOBOT_CHANNEL_ID")]
    pub channel: Option<String>,
    #[arg(long, env = "PICTOBOT_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
    #[arg(long, env = "PICTOBOT_TICK_SECS", default_value_t = 5)]
    pub tick_secs: u64,
    #[arg(long, env = "PICTOBOT_POLL_SECS")]
    pub poll_secs: Option<u64>,
    #[arg(long, env = "PICTOBOT_OUT", default_value = "pictobot-out")]
    pub out: PathBuf,
    #[arg(long, env = "PICTOBOT_EVENTS")]
    pub events: Option<PathBuf>,
}

/// Validated startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub provider: String,
    pub channel: String,
    pub session: SessionConfig,
    pub out: PathBuf,
    pub events: Option<PathBuf>,
}

impl BotConfig {
    pub fn from_args(args: &BotArgs, providers: &ProviderRegistry) -> Result<Self> {
        let channel = args
            .channel
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let Some(channel) = channel else {
            bail!("missing channel id: pass --channel or set PICTOBOT_CHANNEL_ID");
        };

        let provider = args.provider.trim().to_ascii_lowercase();
        if providers.get(&provider).is_none() {
            match credential_hint(&provider) {
                Some(hint) => bail!("provider '{provider}' is not configured: set {hint}"),
                None => bail!(
                    "unknown provider '{provider}' (available: {})",
                    providers.names().join(", ")
                ),
            }
        }
        if args.timeout_secs == 0 {
            bail!("--timeout-secs must be at least 1");
        }

        let mut session = SessionConfig::with_timeout(Duration::from_secs(args.timeout_secs));
        session.tick_interval = Duration::from_secs(args.tick_secs.max(1));
        session.poll_interval = args.poll_secs.map(|secs| Duration::from_secs(secs.max(1)));

        Ok(Self {
            provider,
            channel,
            session,
            out: args.out.clone(),
            events: args.events.clone(),
        })
    }
}

pub fn credential_hint(provider: &str) -> Option<&'static str> {
    match provider {
        "replicate" => Some("REPLICATE_API_TOKEN"),
        "unsplash" => Some("UNSPLASH_ACCESS_KEY"),
        "pixabay" => Some("PIXABAY_API_KEY"),
        _ => None,
    }
}
