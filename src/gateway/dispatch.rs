//! The action dispatcher.
//!
//! A closed mapping from action type to domain service. The match below
//! is exhaustive over [`ActionType`], so adding an action without wiring
//! a service is a compile error. Service failures are translated into
//! one uniform user-facing message; internals never leak into the chat.

use attache_core::intent::{ActionType, IntentDecision};
use attache_core::traits::DomainService;
use attache_memory::Store;
use attache_services::{
    calendar::CalendarClient, CalendarService, ChatService, NoteService, QueryService, TaskService,
};
use std::sync::Arc;
use tracing::{error, info};

pub struct Dispatcher {
    task: TaskService,
    calendar: CalendarService,
    note: NoteService,
    query: Arc<QueryService>,
    chat: Arc<ChatService>,
}

impl Dispatcher {
    pub fn new(
        store: Store,
        calendar: CalendarClient,
        chat: Arc<ChatService>,
        query: Arc<QueryService>,
    ) -> Self {
        Self {
            task: TaskService::new(store.clone()),
            calendar: CalendarService::new(calendar),
            note: NoteService::new(store),
            query,
            chat,
        }
    }

    /// Execute a decision and return the user-facing reply.
    ///
    /// `text` is the original (sanitized) message; only the chat service
    /// consumes it, the others work off the payload.
    pub async fn dispatch(&self, user_id: &str, text: &str, decision: &IntentDecision) -> String {
        let action = decision.action();
        info!("[dispatch] {action} for {user_id}");

        let result = match action {
            ActionType::Task => self.task.execute(user_id, decision).await,
            ActionType::Calendar => self.calendar.execute(user_id, decision).await,
            ActionType::Note => self.note.execute(user_id, decision).await,
            ActionType::Query => self.query.execute(user_id, decision).await,
            ActionType::Chat => self.chat.reply(user_id, text).await,
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                error!("[dispatch] {action} failed: {e}");
                format!("⚠️ Something went wrong while handling that ({action}). Please try again.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use attache_core::intent::{IntentPayload, NotePayload, TaskOp, TaskPayload};
    use attache_llm::{BackendError, LlmBackend, LlmGateway, LlmRequest, LlmResponse, Tier};
    use std::time::Duration;

    struct DeadBackend;

    #[async_trait]
    impl LlmBackend for DeadBackend {
        fn name(&self) -> &str {
            "dead"
        }
        async fn complete(
            &self,
            _model: &str,
            _request: &LlmRequest,
        ) -> Result<LlmResponse, BackendError> {
            Err(BackendError::Fatal("down".into()))
        }
    }

    async fn dispatcher() -> (Dispatcher, Store) {
        let store = Store::in_memory().await.unwrap();
        let gateway = Arc::new(LlmGateway::new(vec![Tier {
            backend: Arc::new(DeadBackend),
            model: "m".into(),
            retries: 0,
            timeout: Duration::from_secs(1),
        }]));
        let calendar = CalendarClient::new(String::new());
        let chat = Arc::new(ChatService::new(gateway.clone(), store.clone()));
        let query = Arc::new(QueryService::new(
            gateway,
            store.clone(),
            calendar.clone(),
            Default::default(),
        ));
        (
            Dispatcher::new(store.clone(), calendar, chat, query),
            store,
        )
    }

    fn decision(payload: IntentPayload) -> IntentDecision {
        IntentDecision {
            payload,
            confidence: 0.9,
            summary: String::new(),
            ambiguous: false,
        }
    }

    #[tokio::test]
    async fn test_task_routed_to_task_service() {
        let (dispatcher, store) = dispatcher().await;
        let d = decision(IntentPayload::Task(TaskPayload {
            action: TaskOp::Create,
            title: "water the plants".into(),
            ..Default::default()
        }));
        let reply = dispatcher.dispatch("u1", "water the plants", &d).await;
        assert!(reply.contains("water the plants"));
        assert_eq!(store.pending_tasks("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_note_routed_to_note_service() {
        let (dispatcher, _store) = dispatcher().await;
        let d = decision(IntentPayload::Note(NotePayload {
            content: "door code 4821".into(),
            tags: vec![],
        }));
        let reply = dispatcher.dispatch("u1", "remember the door code", &d).await;
        assert!(reply.contains("archive"));
    }

    #[tokio::test]
    async fn test_service_error_becomes_uniform_message() {
        // Chat's gateway is dead, so reply() errors out.
        let (dispatcher, _store) = dispatcher().await;
        let reply = dispatcher
            .dispatch("u1", "hello there", &decision(IntentPayload::Chat))
            .await;
        assert!(reply.contains("Something went wrong"));
        assert!(!reply.contains("down"));
    }
}
