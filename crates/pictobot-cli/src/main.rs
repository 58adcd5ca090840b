mod config;
mod surface;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pictobot_contracts::chat::{parse_intent, Intent, CHAT_HELP_COMMANDS};
use pictobot_contracts::events::SessionEventLog;
use pictobot_contracts::generation::SessionState;
use pictobot_engine::{default_provider_registry, Generator, ProviderRegistry, SessionHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::{credential_hint, BotArgs, BotConfig};
use crate::surface::ConsoleSurface;

#[derive(Debug, Parser)]
#[command(name = "pictobot", version, about = "Image generation chat bot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session: each line is a prompt or a slash command.
    Chat(ChatArgs),
    /// Generate one image and exit.
    Run(RunArgs),
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[command(flatten)]
    bot: BotArgs,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[command(flatten)]
    bot: BotArgs,
    #[arg(long)]
    prompt: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("pictobot error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let providers = default_provider_registry();
    match cli.command {
        Command::Chat(args) => {
            let config = BotConfig::from_args(&args.bot, &providers)?;
            run_chat(config, providers).await?;
            Ok(0)
        }
        Command::Run(args) => {
            let config = BotConfig::from_args(&args.bot, &providers)?;
            run_once(config, providers, &args.prompt).await
        }
    }
}

fn build_generator(
    config: &BotConfig,
    providers: &ProviderRegistry,
    surface: Arc<ConsoleSurface>,
) -> Result<Generator> {
    let provider = providers
        .get(&config.provider)
        .with_context(|| format!("provider '{}' is not registered", config.provider))?;
    let mut generator = Generator::new(provider, surface, config.session);
    if let Some(path) = &config.events {
        generator = generator.with_events(SessionEventLog::new(path, bot_id(&config.channel)));
    }
    info!(
        provider = generator.provider_name(),
        channel = %config.channel,
        timeout_secs = config.session.timeout.as_secs(),
        "pictobot ready"
    );
    Ok(generator)
}

fn bot_id(channel: &str) -> String {
    format!("pictobot-{channel}")
}

async fn run_once(config: BotConfig, providers: ProviderRegistry, prompt: &str) -> Result<i32> {
    let surface = Arc::new(ConsoleSurface::stdout(config.out.clone()));
    let generator = build_generator(&config, &providers, surface)?;
    let report = match generator.run(&config.channel, prompt).await {
        Ok(report) => report,
        Err(err) => {
            println!("{}", err.user_message());
            return Ok(2);
        }
    };
    Ok(if report.state == SessionState::Done { 0 } else { 1 })
}

/// Hands each typed prompt its own slot under the channel, so a new prompt
/// never supersedes an unrelated one still running. Regenerate clicks reuse
/// the slot carried by their control.
#[derive(Debug)]
struct ChatSlots {
    channel: String,
    next: u64,
}

impl ChatSlots {
    fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            next: 0,
        }
    }

    fn next_slot(&mut self) -> String {
        self.next += 1;
        format!("{}/{}", self.channel, self.next)
    }
}

async fn run_chat(config: BotConfig, providers: ProviderRegistry) -> Result<()> {
    let surface = Arc::new(ConsoleSurface::stdout(config.out.clone()));
    let mut generator = build_generator(&config, &providers, Arc::clone(&surface))?;
    let mut running: Vec<SessionHandle> = Vec::new();
    let channel = config.channel.as_str();
    let mut slots = ChatSlots::new(channel);

    println!("pictobot chat started on #{channel}. Type /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        running.retain(|handle| !handle.is_finished());
        match parse_intent(&line) {
            Intent::Noop => {}
            Intent::Generate { prompt } => match generator.start(&slots.next_slot(), &prompt) {
                Ok(handle) => running.push(handle),
                Err(err) => println!("{}", err.user_message()),
            },
            Intent::Regenerate => {
                let Some(control) = surface.last_control() else {
                    println!("Nothing to regenerate yet.");
                    continue;
                };
                running.push(generator.regenerate(&control));
            }
            Intent::SetProvider { name } => {
                if name.is_empty() {
                    println!("Provider: {}", generator.provider_name());
                    continue;
                }
                match providers.get(&name) {
                    Some(provider) => {
                        generator = generator.with_provider(provider);
                        println!("Provider set to {name}");
                    }
                    None => match credential_hint(&name) {
                        Some(hint) => println!("Provider {name} needs {hint}"),
                        None => println!("Unknown provider: {name}"),
                    },
                }
            }
            Intent::ListProviders => {
                println!("Providers: {}", providers.names().join(", "));
            }
            Intent::Help => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
            }
            Intent::Quit => break,
            Intent::Unknown { command, .. } => {
                println!("Unknown command: /{command}");
            }
        }
    }

    for handle in running {
        let session_id = handle.session_id();
        if let Err(err) = handle.wait().await {
            warn!(session_id, %err, "session task failed");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::ChatSlots;

    #[test]
    fn each_prompt_gets_its_own_slot() {
        let mut slots = ChatSlots::new("general");

        let issued: Vec<String> = (0..3).map(|_| slots.next_slot()).collect();

        assert_eq!(issued, vec!["general/1", "general/2", "general/3"]);
    }
}
