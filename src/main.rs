mod gateway;

use attache_channels::telegram::TelegramChannel;
use attache_core::config;
use attache_llm::{gemini::GeminiBackend, groq::GroqBackend, LlmGateway, Tier};
use attache_memory::Store;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "attache",
    version,
    about = "Attache — personal chief-of-staff assistant"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the assistant.
    Start,
    /// Check configuration and backend keys.
    Status,
    /// Send a one-shot message through the language-model gateway.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;

            let llm = Arc::new(build_llm_gateway(&cfg)?);

            let mut channels: HashMap<String, Arc<dyn attache_core::traits::Channel>> =
                HashMap::new();

            if let Some(ref tg) = cfg.channel.telegram {
                if tg.enabled {
                    if tg.bot_token.is_empty() {
                        anyhow::bail!(
                            "Telegram is enabled but bot_token is empty. \
                             Set it in config.toml or TELEGRAM_BOT_TOKEN env var."
                        );
                    }
                    let channel = TelegramChannel::new(tg.clone());
                    channels.insert("telegram".to_string(), Arc::new(channel));
                }
            }

            if channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable at least one channel in config.toml.");
            }

            let store = Store::new(&cfg.memory).await?;

            println!("Attache — starting...");
            let gw = Arc::new(gateway::Gateway::new(llm, channels, store, cfg));
            gw.run().await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Attache — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Tiers:");
            for tier in &cfg.llm.tiers {
                let key = match tier.backend.as_str() {
                    "groq" => !cfg.llm.groq_api_key.is_empty(),
                    "gemini" => !cfg.llm.gemini_api_key.is_empty(),
                    _ => false,
                };
                println!(
                    "  {}/{}: {}",
                    tier.backend,
                    tier.model,
                    if key { "key configured" } else { "missing key" }
                );
            }
            println!();

            if let Some(ref tg) = cfg.channel.telegram {
                println!(
                    "  telegram: {}",
                    if tg.enabled && !tg.bot_token.is_empty() {
                        "configured"
                    } else if tg.enabled {
                        "enabled but missing bot_token"
                    } else {
                        "disabled"
                    }
                );
            } else {
                println!("  telegram: not configured");
            }
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: attache ask <message>");
            }

            let prompt = message.join(" ");
            let cfg = config::load(&cli.config)?;
            let llm = build_llm_gateway(&cfg)?;

            let request = attache_llm::LlmRequest::single(
                attache_services::prompts::ASSISTANT_IDENTITY,
                prompt,
            );
            let response = llm.complete(&request).await?;
            println!("{}", response.text);
        }
    }

    Ok(())
}

/// Build the tiered language-model gateway from the configured tier list.
fn build_llm_gateway(cfg: &config::Config) -> anyhow::Result<LlmGateway> {
    let mut tiers = Vec::with_capacity(cfg.llm.tiers.len());
    for tier_cfg in &cfg.llm.tiers {
        let backend: Arc<dyn attache_llm::LlmBackend> = match tier_cfg.backend.as_str() {
            "groq" => Arc::new(GroqBackend::new(cfg.llm.groq_api_key.clone())),
            "gemini" => Arc::new(GeminiBackend::new(cfg.llm.gemini_api_key.clone())),
            other => anyhow::bail!("unsupported backend: {other}"),
        };
        tiers.push(Tier {
            backend,
            model: tier_cfg.model.clone(),
            retries: tier_cfg.retries,
            timeout: Duration::from_secs(tier_cfg.timeout_secs),
        });
    }
    if tiers.is_empty() {
        anyhow::bail!("no LLM tiers configured");
    }
    Ok(LlmGateway::new(tiers))
}
