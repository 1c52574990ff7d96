//! The per-message pipeline.
//!
//! Order matters here:
//! 1. authorization (rejected senders never touch durable state)
//! 2. dedup ledger insert (a redelivered update is dropped silently,
//!    before any paid transcription work)
//! 3. voice transcription
//! 4. confirm/cancel replies against the pending-confirmation row
//! 5. link interception (a shared URL is archived, not classified)
//! 6. sanitization, classification, and dispatch

use super::{auth, confirm};
use attache_core::{
    intent::{IntentPayload, TaskOp},
    message::InboundMessage,
    sanitize::sanitize,
};
use attache_memory::store::ClaimOutcome;
use attache_services::url::extract_urls;
use tracing::{debug, error, info, warn};

impl super::Gateway {
    pub(super) async fn handle_message(self: std::sync::Arc<Self>, mut incoming: InboundMessage) {
        let user_id = incoming.sender_id.clone();

        if !auth::authorized(&self.config, &incoming) {
            warn!(
                "[pipeline] rejected unauthorized sender {user_id} on {}",
                incoming.channel
            );
            self.send_text(&incoming, &self.config.auth.deny_message)
                .await;
            return;
        }

        // At-most-once: only the first delivery of this update proceeds.
        // Must precede transcription: a redelivered voice update is
        // dropped without another transcription call.
        match self
            .store
            .mark_processed(&incoming.channel, &incoming.id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    "[pipeline] duplicate delivery {}:{}, dropping",
                    incoming.channel, incoming.id
                );
                return;
            }
            Err(e) => {
                error!("[pipeline] dedup ledger unavailable, dropping message: {e}");
                return;
            }
        }

        if let (Some(channel), Some(target)) = (
            self.channels.get(&incoming.channel),
            incoming.reply_target.as_deref(),
        ) {
            if let Err(e) = channel.send_typing(target).await {
                debug!("[pipeline] typing indicator failed: {e}");
            }
        }

        if let Some(voice) = incoming.voice.take() {
            let Some(ref transcriber) = self.transcriber else {
                self.send_text(
                    &incoming,
                    "I can't transcribe voice messages right now. Please type it out.",
                )
                .await;
                return;
            };
            match transcriber.transcribe(&voice.data, &voice.mime_type).await {
                Ok(transcript) => {
                    info!("[pipeline] transcribed {}s voice message", voice.duration_secs);
                    incoming.text = transcript;
                }
                Err(e) => {
                    warn!("[pipeline] transcription failed: {e}");
                    self.send_text(
                        &incoming,
                        "Sorry, I couldn't make out that voice message. Please try again.",
                    )
                    .await;
                    return;
                }
            }
        }

        if confirm::is_affirmative(&incoming.text) {
            match self.store.confirm_pending(&user_id).await {
                Ok(ClaimOutcome::Claimed(pending)) => {
                    info!("[pipeline] confirmed pending action {}", pending.id);
                    let reply = self
                        .dispatcher
                        .dispatch(&user_id, &incoming.text, &pending.decision)
                        .await;
                    self.finish(&incoming, &user_id, &reply, &pending.decision.action().to_string(), pending.decision.confidence)
                        .await;
                    return;
                }
                Ok(ClaimOutcome::Expired(dropped)) => {
                    let reply = format!(
                        "⏱ That request expired before you confirmed, so nothing was done: {}. \
                         Send it again if you still want it.",
                        dropped.summary
                    );
                    self.finish(&incoming, &user_id, &reply, "expired", dropped.decision.confidence)
                        .await;
                    return;
                }
                // Nothing awaiting: "yes" is just a chat message.
                Ok(ClaimOutcome::Nothing) => {}
                Err(e) => {
                    error!("[pipeline] confirm lookup failed: {e}");
                    self.send_text(&incoming, "⚠️ I couldn't process that. Please try again.")
                        .await;
                    return;
                }
            }
        } else if confirm::is_negative(&incoming.text) {
            match self.store.cancel_pending(&user_id).await {
                Ok(ClaimOutcome::Claimed(pending)) => {
                    info!("[pipeline] cancelled pending action {}", pending.id);
                    let reply = format!("❌ Cancelled: {}", pending.summary);
                    self.finish(&incoming, &user_id, &reply, "cancel", pending.decision.confidence)
                        .await;
                    return;
                }
                Ok(ClaimOutcome::Expired(dropped)) => {
                    let reply = format!(
                        "That request had already expired, so nothing was pending: {}.",
                        dropped.summary
                    );
                    self.finish(&incoming, &user_id, &reply, "expired", dropped.decision.confidence)
                        .await;
                    return;
                }
                Ok(ClaimOutcome::Nothing) => {}
                Err(e) => {
                    error!("[pipeline] cancel lookup failed: {e}");
                    self.send_text(&incoming, "⚠️ I couldn't process that. Please try again.")
                        .await;
                    return;
                }
            }
        }

        let cleaned = sanitize(&incoming.text);
        if cleaned.was_modified {
            warn!(
                "[pipeline] sanitized message from {user_id}: {}",
                cleaned.warnings.join("; ")
            );
        }

        // A shared link is archived directly; classification never sees it.
        if let Some(url) = extract_urls(&cleaned.text).first() {
            let reply = match self.url.archive_url(&user_id, url).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!("[pipeline] link archiving failed: {e}");
                    "⚠️ I couldn't process that link. Please try again.".to_string()
                }
            };
            self.finish(&incoming, &user_id, &reply, "url", 1.0).await;
            return;
        }

        let recent = self
            .store
            .recent_context(&user_id, 10)
            .await
            .unwrap_or_default();

        let decision = self.router.classify(&cleaned.text, &recent).await;

        if decision.ambiguous {
            let reply = format!(
                "🤔 I'm not sure I got that ({}). Could you rephrase?",
                decision.summary
            );
            self.finish(&incoming, &user_id, &reply, "clarify", decision.confidence)
                .await;
            return;
        }

        if confirm::needs_confirmation(&decision, self.config.router.confirm_threshold) {
            match self
                .store
                .create_pending(&user_id, &decision, self.config.confirm.ttl_secs)
                .await
            {
                Ok(pending) => {
                    let reply = confirm::confirmation_prompt(&pending);
                    self.finish(&incoming, &user_id, &reply, "confirm_request", decision.confidence)
                        .await;
                }
                Err(e) => {
                    error!("[pipeline] failed to stage confirmation: {e}");
                    self.send_text(&incoming, "⚠️ I couldn't process that. Please try again.")
                        .await;
                }
            }
            return;
        }

        // A create whose title fuzzily matches an open task is staged
        // for confirmation; the staged decision re-runs the create when
        // the user says yes.
        if let IntentPayload::Task(payload) = &decision.payload {
            if payload.action == TaskOp::Create && !payload.title.trim().is_empty() {
                match self.store.find_similar_task(&user_id, &payload.title).await {
                    Ok(Some(existing)) => {
                        match self
                            .store
                            .create_pending(&user_id, &decision, self.config.confirm.ttl_secs)
                            .await
                        {
                            Ok(_) => {
                                let reply = format!(
                                    "You already have a similar task: \"{existing}\". \
                                     Add this one anyway? Reply 'yes' / 'כן' or 'no' / 'לא'."
                                );
                                self.finish(&incoming, &user_id, &reply, "confirm_request", decision.confidence)
                                    .await;
                                return;
                            }
                            Err(e) => {
                                error!("[pipeline] failed to stage duplicate-task confirmation: {e}");
                                self.send_text(&incoming, "⚠️ I couldn't process that. Please try again.")
                                    .await;
                                return;
                            }
                        }
                    }
                    Ok(None) => {}
                    // Best-effort check; the create still proceeds.
                    Err(e) => warn!("[pipeline] duplicate-task check failed: {e}"),
                }
            }
        }

        let reply = self
            .dispatcher
            .dispatch(&user_id, &cleaned.text, &decision)
            .await;
        self.finish(&incoming, &user_id, &reply, &decision.action().to_string(), decision.confidence)
            .await;
    }

    /// Log the exchange and send the reply.
    async fn finish(
        &self,
        incoming: &InboundMessage,
        user_id: &str,
        reply: &str,
        action: &str,
        confidence: f64,
    ) {
        if let Err(e) = self
            .store
            .log_interaction(
                user_id,
                &incoming.channel,
                &incoming.text,
                reply,
                action,
                confidence,
                None,
            )
            .await
        {
            warn!("[pipeline] failed to log interaction: {e}");
        }
        self.send_text(incoming, reply).await;
    }
}
