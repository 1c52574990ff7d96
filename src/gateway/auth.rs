//! Sender authorization.
//!
//! The allow-list comes from config at construction time; nothing here
//! reads global state. Rejection happens before any durable side effect,
//! so an unauthorized redelivery never touches the dedup ledger.

use attache_core::{config::Config, message::InboundMessage};

/// Whether this sender may use the assistant.
///
/// With auth enabled and no allow-list configured for the channel,
/// everyone is rejected. Disabled auth admits everyone.
pub(super) fn authorized(config: &Config, incoming: &InboundMessage) -> bool {
    if !config.auth.enabled {
        return true;
    }

    match incoming.channel.as_str() {
        "telegram" => {
            let Some(ref tg) = config.channel.telegram else {
                return false;
            };
            incoming
                .sender_id
                .parse::<i64>()
                .map(|id| tg.allowed_users.contains(&id))
                .unwrap_or(false)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attache_core::config::TelegramConfig;
    use chrono::Utc;

    fn incoming(channel: &str, sender_id: &str) -> InboundMessage {
        InboundMessage {
            id: "1".into(),
            channel: channel.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            text: "hi".into(),
            timestamp: Utc::now(),
            voice: None,
            reply_target: None,
        }
    }

    fn config_with_allowlist(allowed: Vec<i64>) -> Config {
        let mut config: Config = toml::from_str("").unwrap();
        config.channel.telegram = Some(TelegramConfig {
            enabled: true,
            bot_token: "t".into(),
            allowed_users: allowed,
        });
        config
    }

    #[test]
    fn test_allowed_user_passes() {
        let config = config_with_allowlist(vec![42]);
        assert!(authorized(&config, &incoming("telegram", "42")));
    }

    #[test]
    fn test_unknown_user_rejected() {
        let config = config_with_allowlist(vec![42]);
        assert!(!authorized(&config, &incoming("telegram", "99")));
    }

    #[test]
    fn test_empty_allowlist_rejects_everyone() {
        let config = config_with_allowlist(vec![]);
        assert!(!authorized(&config, &incoming("telegram", "42")));
    }

    #[test]
    fn test_disabled_auth_admits_everyone() {
        let mut config = config_with_allowlist(vec![]);
        config.auth.enabled = false;
        assert!(authorized(&config, &incoming("telegram", "99")));
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let config = config_with_allowlist(vec![42]);
        assert!(!authorized(&config, &incoming("carrier-pigeon", "42")));
    }

    #[test]
    fn test_non_numeric_sender_rejected() {
        let config = config_with_allowlist(vec![42]);
        assert!(!authorized(&config, &incoming("telegram", "not-a-number")));
    }
}
