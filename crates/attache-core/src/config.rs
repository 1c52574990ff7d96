use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AttacheError;

/// Top-level Attache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub attache: AgentConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub confirm: ConfirmConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// General agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Authorization configuration.
///
/// The allow-list is passed into the gateway at construction; there is no
/// ambient global state, so tests can swap it freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether auth is enforced (default: true).
    /// When true and no allowed_users are set on any channel, ALL messages are rejected.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Message sent to unauthorized users.
    #[serde(default = "default_deny_message")]
    pub deny_message: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            deny_message: default_deny_message(),
        }
    }
}

/// Language-model gateway configuration: an ordered list of tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Tiers in priority order. The gateway tries each in turn.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,
    /// Groq API key (env fallback: GROQ_API_KEY).
    #[serde(default)]
    pub groq_api_key: String,
    /// Gemini API key (env fallback: GEMINI_API_KEY).
    #[serde(default)]
    pub gemini_api_key: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            groq_api_key: String::new(),
            gemini_api_key: String::new(),
        }
    }
}

/// One backend option in the gateway's ordered fallback list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    /// Backend identifier: "groq" or "gemini".
    pub backend: String,
    pub model: String,
    /// Retries within this tier on transient failure (default: 1).
    #[serde(default = "default_tier_retries")]
    pub retries: u32,
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_tier_timeout_secs")]
    pub timeout_secs: u64,
}

/// Intent router thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Below this confidence the decision is flagged ambiguous.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Runner-up within this margin of the top score also flags ambiguity.
    #[serde(default = "default_ambiguity_margin")]
    pub ambiguity_margin: f64,
    /// Non-destructive actions below this confidence are confirmation-gated.
    #[serde(default = "default_confirm_threshold")]
    pub confirm_threshold: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            ambiguity_margin: default_ambiguity_margin(),
            confirm_threshold: default_confirm_threshold(),
        }
    }
}

/// Confirmation state machine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmConfig {
    /// Seconds before an awaiting confirmation expires.
    #[serde(default = "default_confirm_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_confirm_ttl_secs(),
        }
    }
}

/// Memory config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Days to keep processed-message ledger entries before pruning.
    #[serde(default = "default_dedup_retention_days")]
    pub dedup_retention_days: u32,
    #[serde(default = "default_max_context")]
    pub max_context_messages: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            dedup_retention_days: default_dedup_retention_days(),
            max_context_messages: default_max_context(),
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub telegram: Option<TelegramConfig>,
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Env fallback: TELEGRAM_BOT_TOKEN.
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

/// External context source configuration for query answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Calendar collaborator base URL. Empty = calendar not connected.
    #[serde(default)]
    pub calendar_url: String,
    /// Email collaborator base URL. Empty = email not connected.
    #[serde(default)]
    pub email_url: String,
    /// Brave Search API key. Empty = web search disabled.
    #[serde(default)]
    pub brave_api_key: String,
    /// Market index symbols.
    #[serde(default = "default_indices")]
    pub stock_indices: Vec<String>,
    /// Watchlist ticker symbols.
    #[serde(default = "default_watchlist")]
    pub stock_watchlist: Vec<String>,
    /// Per-source fetch timeout in seconds.
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            calendar_url: String::new(),
            email_url: String::new(),
            brave_api_key: String::new(),
            stock_indices: default_indices(),
            stock_watchlist: default_watchlist(),
            timeout_secs: default_source_timeout_secs(),
        }
    }
}

/// Pipeline-wide limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Overall budget for handling one message, in seconds.
    #[serde(default = "default_message_timeout_secs")]
    pub message_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            message_timeout_secs: default_message_timeout_secs(),
        }
    }
}

// --- Default value functions ---

fn default_name() -> String {
    "Attache".to_string()
}
fn default_data_dir() -> String {
    "~/.attache".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_deny_message() -> String {
    "Access denied. You are not authorized to use this assistant.".to_string()
}
fn default_tiers() -> Vec<TierConfig> {
    vec![
        TierConfig {
            backend: "gemini".into(),
            model: "gemini-2.5-flash".into(),
            retries: default_tier_retries(),
            timeout_secs: default_tier_timeout_secs(),
        },
        TierConfig {
            backend: "gemini".into(),
            model: "gemini-2.0-flash".into(),
            retries: default_tier_retries(),
            timeout_secs: default_tier_timeout_secs(),
        },
        TierConfig {
            backend: "groq".into(),
            model: "moonshotai/kimi-k2-instruct-0905".into(),
            retries: default_tier_retries(),
            timeout_secs: default_tier_timeout_secs(),
        },
    ]
}
fn default_tier_retries() -> u32 {
    1
}
fn default_tier_timeout_secs() -> u64 {
    10
}
fn default_confidence_threshold() -> f64 {
    0.55
}
fn default_ambiguity_margin() -> f64 {
    0.15
}
fn default_confirm_threshold() -> f64 {
    0.75
}
fn default_confirm_ttl_secs() -> u64 {
    120
}
fn default_db_path() -> String {
    "~/.attache/memory.db".to_string()
}
fn default_dedup_retention_days() -> u32 {
    7
}
fn default_max_context() -> usize {
    50
}
fn default_indices() -> Vec<String> {
    vec!["^GSPC".into(), "^IXIC".into()]
}
fn default_watchlist() -> Vec<String> {
    vec![
        "NVDA".into(),
        "MSFT".into(),
        "GOOGL".into(),
        "META".into(),
        "AAPL".into(),
    ]
}
fn default_source_timeout_secs() -> u64 {
    10
}
fn default_message_timeout_secs() -> u64 {
    55
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. Secrets left empty
/// in the file are filled from environment variables.
pub fn load(path: &str) -> Result<Config, AttacheError> {
    let path = Path::new(path);
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AttacheError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| AttacheError::Config(format!("failed to parse config: {e}")))?
    } else {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        toml::from_str("").map_err(|e| AttacheError::Config(format!("defaults: {e}")))?
    };

    if config.llm.groq_api_key.is_empty() {
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            config.llm.groq_api_key = key;
        }
    }
    if config.llm.gemini_api_key.is_empty() {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            config.llm.gemini_api_key = key;
        }
    }
    if let Some(ref mut tg) = config.channel.telegram {
        if tg.bot_token.is_empty() {
            if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
                tg.bot_token = token;
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_from_empty_toml() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.attache.name, "Attache");
        assert!(cfg.auth.enabled);
        assert_eq!(cfg.llm.tiers.len(), 3);
        assert_eq!(cfg.llm.tiers[0].backend, "gemini");
        assert_eq!(cfg.llm.tiers[2].backend, "groq");
        assert_eq!(cfg.router.confidence_threshold, 0.55);
        assert_eq!(cfg.router.ambiguity_margin, 0.15);
        assert_eq!(cfg.confirm.ttl_secs, 120);
        assert_eq!(cfg.memory.dedup_retention_days, 7);
        assert_eq!(cfg.pipeline.message_timeout_secs, 55);
    }

    #[test]
    fn test_tier_defaults_when_missing() {
        let toml_str = r#"
            backend = "groq"
            model = "moonshotai/kimi-k2-instruct-0905"
        "#;
        let tier: TierConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(tier.retries, 1);
        assert_eq!(tier.timeout_secs, 10);
    }

    #[test]
    fn test_custom_tier_list() {
        let toml_str = r#"
            [[llm.tiers]]
            backend = "groq"
            model = "llama-3.3-70b"
            retries = 2
            timeout_secs = 5
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.tiers.len(), 1);
        assert_eq!(cfg.llm.tiers[0].retries, 2);
    }

    #[test]
    fn test_telegram_config() {
        let toml_str = r#"
            [channel.telegram]
            enabled = true
            bot_token = "123:abc"
            allowed_users = [42]
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        let tg = cfg.channel.telegram.unwrap();
        assert!(tg.enabled);
        assert_eq!(tg.allowed_users, vec![42]);
    }

    #[test]
    fn test_shellexpand_home() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(shellexpand("~/x.db"), "/home/tester/x.db");
        assert_eq!(shellexpand("/abs/x.db"), "/abs/x.db");
    }
}
