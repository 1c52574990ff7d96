//! Gateway — the main event loop connecting channels, the store, and the
//! language-model gateway.
//!
//! Every inbound message is handled in its own spawned task under one
//! overall deadline; the per-message pipeline lives in `pipeline`.

mod auth;
mod confirm;
mod dispatch;
mod pipeline;
mod routing;


pub use dispatch::Dispatcher;
pub use routing::IntentRouter;

use attache_core::{
    config::Config,
    message::{InboundMessage, OutboundMessage, ReplyMetadata},
    traits::{Channel, Transcriber},
};
use attache_llm::{transcribe::GeminiTranscriber, LlmGateway};
use attache_memory::Store;
use attache_services::{calendar::CalendarClient, ChatService, QueryService, UrlService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// How often the dedup ledger is pruned.
const PRUNE_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// The central gateway.
pub struct Gateway {
    pub(super) llm: Arc<LlmGateway>,
    pub(super) channels: HashMap<String, Arc<dyn Channel>>,
    pub(super) store: Store,
    pub(super) router: IntentRouter,
    pub(super) dispatcher: Dispatcher,
    pub(super) url: UrlService,
    pub(super) transcriber: Option<Arc<dyn Transcriber>>,
    pub(super) config: Config,
}

impl Gateway {
    /// Create a new gateway, wiring up services from config.
    pub fn new(
        llm: Arc<LlmGateway>,
        channels: HashMap<String, Arc<dyn Channel>>,
        store: Store,
        config: Config,
    ) -> Self {
        let calendar = CalendarClient::new(config.sources.calendar_url.clone());
        let chat = Arc::new(ChatService::new(llm.clone(), store.clone()));
        let query = Arc::new(QueryService::new(
            llm.clone(),
            store.clone(),
            calendar.clone(),
            config.sources.clone(),
        ));
        let dispatcher = Dispatcher::new(store.clone(), calendar, chat, query);
        let router = IntentRouter::new(llm.clone(), config.router.clone());
        let url = UrlService::new(llm.clone(), store.clone());

        let transcriber: Option<Arc<dyn Transcriber>> = if config.llm.gemini_api_key.is_empty() {
            None
        } else {
            Some(Arc::new(GeminiTranscriber::new(
                config.llm.gemini_api_key.clone(),
                "gemini-2.0-flash".to_string(),
            )))
        };

        Self {
            llm,
            channels,
            store,
            router,
            dispatcher,
            url,
            transcriber,
            config,
        }
    }

    /// Run the main event loop.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Attache gateway running | tiers: {} | channels: {} | auth: {}",
            self.llm.tier_count(),
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
            if self.config.auth.enabled {
                "enforced"
            } else {
                "disabled"
            },
        );

        let (tx, mut rx) = mpsc::channel::<InboundMessage>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(msg) = channel_rx.recv().await {
                    if tx.send(msg).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        // Periodic dedup ledger pruning.
        let prune_store = self.store.clone();
        let retention_days = self.config.memory.dedup_retention_days;
        let prune_handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(PRUNE_INTERVAL).await;
                match prune_store.prune_processed(retention_days).await {
                    Ok(n) if n > 0 => info!("pruned {n} dedup ledger entries"),
                    Ok(_) => {}
                    Err(e) => warn!("dedup prune failed: {e}"),
                }
            }
        });

        let message_budget = Duration::from_secs(self.config.pipeline.message_timeout_secs);

        // Main event loop with graceful shutdown. Each message gets its
        // own task so one slow pipeline never blocks the others.
        loop {
            tokio::select! {
                Some(incoming) = rx.recv() => {
                    let gw = self.clone();
                    tokio::spawn(async move {
                        let desc = format!("{}:{}", incoming.channel, incoming.id);
                        if tokio::time::timeout(message_budget, gw.clone().handle_message(incoming))
                            .await
                            .is_err()
                        {
                            error!("message {desc} exceeded the {message_budget:?} budget");
                        }
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        prune_handle.abort();

        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }

        info!("Shutdown complete.");
        Ok(())
    }

    /// Send a plain text message back to the sender.
    pub(super) async fn send_text(&self, incoming: &InboundMessage, text: &str) {
        let msg = OutboundMessage {
            text: text.to_string(),
            metadata: ReplyMetadata::default(),
            reply_target: incoming.reply_target.clone(),
        };

        if let Some(channel) = self.channels.get(&incoming.channel) {
            if let Err(e) = channel.send(msg).await {
                error!("failed to send message: {e}");
            }
        }
    }
}
