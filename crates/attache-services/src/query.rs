//! Context-aware query answering.
//!
//! Fetches the requested context sources in parallel, each under its own
//! timeout, then synthesizes an answer through the gateway. A failing or
//! slow source degrades to a placeholder line; it never sinks the whole
//! answer. If the gateway itself is down, the raw context blocks are
//! returned so the user still gets the data.

use crate::calendar::CalendarClient;
use crate::prompts::{ASSISTANT_IDENTITY, RECENT_CONVERSATION_HEADER};
use crate::sources::{
    ArchiveSource, CalendarSource, EmailSource, MarketSource, NewsSource, SearchSource,
    TasksSource,
};
use async_trait::async_trait;
use attache_core::{
    config::SourcesConfig,
    error::AttacheError,
    intent::{ContextKind, IntentDecision, IntentPayload, QueryPayload},
    traits::{ContextSource, DomainService},
};
use attache_llm::{ChatTurn, LlmGateway, LlmRequest};
use attache_memory::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

const QUERY_CONTEXT_MESSAGES: usize = 5;

pub struct QueryService {
    gateway: Arc<LlmGateway>,
    store: Store,
    calendar: CalendarClient,
    config: SourcesConfig,
}

impl QueryService {
    pub fn new(
        gateway: Arc<LlmGateway>,
        store: Store,
        calendar: CalendarClient,
        config: SourcesConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            calendar,
            config,
        }
    }

    fn source_for(&self, kind: ContextKind, user_id: &str) -> Arc<dyn ContextSource> {
        match kind {
            ContextKind::Calendar => Arc::new(CalendarSource::new(self.calendar.clone())),
            ContextKind::Tasks => {
                Arc::new(TasksSource::new(self.store.clone(), user_id.to_string()))
            }
            ContextKind::Archive => {
                Arc::new(ArchiveSource::new(self.store.clone(), user_id.to_string()))
            }
            ContextKind::Email => Arc::new(EmailSource::new(self.config.email_url.clone())),
            ContextKind::Web => Arc::new(SearchSource::new(self.config.brave_api_key.clone())),
            ContextKind::News => Arc::new(NewsSource::new()),
            ContextKind::Market => Arc::new(MarketSource::new(
                self.config.stock_indices.clone(),
                self.config.stock_watchlist.clone(),
            )),
        }
    }

    /// Answer a query, fetching the needed context in parallel.
    pub async fn answer(&self, user_id: &str, payload: &QueryPayload) -> Result<String, AttacheError> {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        // Collapse repeated kinds to one fetch each, wherever they
        // appear in the classifier's list.
        let mut kinds: Vec<ContextKind> = Vec::new();
        for kind in &payload.context_needed {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }

        let mut set: JoinSet<(ContextKind, Result<String, AttacheError>)> = JoinSet::new();
        for kind in kinds {
            let source = self.source_for(kind, user_id);
            let query = payload.query.clone();
            let target_date = payload.target_date.clone();
            set.spawn(async move {
                let result = match tokio::time::timeout(
                    timeout,
                    source.fetch(&query, target_date.as_deref()),
                )
                .await
                {
                    Ok(r) => r,
                    Err(_) => Err(AttacheError::Service(format!(
                        "{} timed out after {timeout:?}",
                        source.name()
                    ))),
                };
                (kind, result)
            });
        }

        let mut blocks = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(block))) => blocks.push(block),
                Ok((kind, Err(e))) => {
                    warn!("[query] source {} failed: {e}", kind.as_str());
                    blocks.push(format!("⚠️ {} data unavailable right now.", kind.as_str()));
                }
                Err(e) => warn!("[query] source task panicked: {e}"),
            }
        }

        let recent = self
            .store
            .recent_context(user_id, QUERY_CONTEXT_MESSAGES)
            .await
            .unwrap_or_default();

        info!(
            "[query] answering with {} context block(s) for {user_id}",
            blocks.len()
        );

        let mut system = ASSISTANT_IDENTITY.to_string();
        if !recent.is_empty() {
            let lines: Vec<String> = recent
                .iter()
                .flat_map(|ix| {
                    [
                        format!("User: {}", crate::chat::truncate(&ix.user_text, 100)),
                        format!("You: {}", crate::chat::truncate(&ix.reply_text, 150)),
                    ]
                })
                .collect();
            system.push_str(&format!(
                "\n\n{RECENT_CONVERSATION_HEADER}\n{}",
                lines.join("\n")
            ));
        }

        let user_content = if blocks.is_empty() {
            payload.query.clone()
        } else {
            format!(
                "Relevant data:\n{}\n\nUser asks: {}",
                blocks.join("\n\n"),
                payload.query
            )
        };

        let request = LlmRequest {
            system,
            messages: vec![ChatTurn::user(user_content)],
            json: false,
        };

        match self.gateway.complete(&request).await {
            Ok(resp) => Ok(resp.text),
            Err(e) => {
                warn!("[query] synthesis failed, returning raw context: {e}");
                if blocks.is_empty() {
                    Ok("I couldn't reach my answering service. Please try again shortly."
                        .to_string())
                } else {
                    Ok(format!(
                        "I couldn't summarize right now, but here's what I found:\n\n{}",
                        blocks.join("\n\n")
                    ))
                }
            }
        }
    }
}

#[async_trait]
impl DomainService for QueryService {
    fn name(&self) -> &str {
        "query"
    }

    async fn execute(
        &self,
        user_id: &str,
        decision: &IntentDecision,
    ) -> Result<String, AttacheError> {
        match &decision.payload {
            IntentPayload::Query(payload) => self.answer(user_id, payload).await,
            other => Err(AttacheError::Service(format!(
                "query service got non-query payload: {other:?}"
            ))),
        }
    }
}
