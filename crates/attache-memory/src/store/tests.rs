//! Store integration tests against an in-memory database.

use super::{ClaimOutcome, Store};
use attache_core::config::MemoryConfig;
use attache_core::intent::{
    IntentDecision, IntentPayload, NotePayload, TaskOp, TaskPayload,
};

fn task_decision(title: &str, op: TaskOp) -> IntentDecision {
    IntentDecision {
        payload: IntentPayload::Task(TaskPayload {
            action: op,
            title: title.to_string(),
            ..Default::default()
        }),
        confidence: 0.9,
        summary: format!("{op:?} task: {title}"),
        ambiguous: false,
    }
}

// --- dedup ledger ---

#[tokio::test]
async fn test_mark_processed_first_wins() {
    let store = Store::in_memory().await.unwrap();
    assert!(store.mark_processed("telegram", "100").await.unwrap());
    assert!(!store.mark_processed("telegram", "100").await.unwrap());
}

#[tokio::test]
async fn test_mark_processed_scoped_by_channel() {
    let store = Store::in_memory().await.unwrap();
    assert!(store.mark_processed("telegram", "100").await.unwrap());
    assert!(store.mark_processed("whatsapp", "100").await.unwrap());
}

#[tokio::test]
async fn test_concurrent_claims_exactly_one_winner() {
    let store = Store::in_memory().await.unwrap();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.mark_processed("telegram", "777").await.unwrap()
        }));
    }
    let mut winners = 0;
    for h in handles {
        if h.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_prune_keeps_recent_entries() {
    let store = Store::in_memory().await.unwrap();
    store.mark_processed("telegram", "1").await.unwrap();
    let pruned = store.prune_processed(7).await.unwrap();
    assert_eq!(pruned, 0);
    // Still deduplicated after the prune pass.
    assert!(!store.mark_processed("telegram", "1").await.unwrap());
}

// --- confirmation state machine ---

#[tokio::test]
async fn test_confirm_lifecycle() {
    let store = Store::in_memory().await.unwrap();
    let decision = task_decision("delete old report", TaskOp::Delete);

    let pending = store.create_pending("u1", &decision, 120).await.unwrap();
    assert_eq!(
        store.confirmation_state(&pending.id).await.unwrap().as_deref(),
        Some("awaiting")
    );

    let claimed = store.confirm_pending("u1").await.unwrap().claimed().unwrap();
    assert_eq!(claimed.id, pending.id);
    assert!(claimed.decision.is_destructive());
    assert_eq!(
        store.confirmation_state(&pending.id).await.unwrap().as_deref(),
        Some("confirmed")
    );

    // Second confirm finds nothing: the action runs at most once.
    assert!(matches!(
        store.confirm_pending("u1").await.unwrap(),
        ClaimOutcome::Nothing
    ));
}

#[tokio::test]
async fn test_cancel_pending() {
    let store = Store::in_memory().await.unwrap();
    let decision = task_decision("clear everything", TaskOp::CompleteAll);

    let pending = store.create_pending("u1", &decision, 120).await.unwrap();
    let claimed = store.cancel_pending("u1").await.unwrap().claimed();
    assert!(claimed.is_some());
    assert_eq!(
        store.confirmation_state(&pending.id).await.unwrap().as_deref(),
        Some("cancelled")
    );
}

#[tokio::test]
async fn test_new_pending_supersedes_old() {
    let store = Store::in_memory().await.unwrap();
    let first = store
        .create_pending("u1", &task_decision("delete a", TaskOp::Delete), 120)
        .await
        .unwrap();
    let second = store
        .create_pending("u1", &task_decision("delete b", TaskOp::Delete), 120)
        .await
        .unwrap();

    assert_eq!(
        store.confirmation_state(&first.id).await.unwrap().as_deref(),
        Some("superseded")
    );

    // Confirm resolves the newest request, not the superseded one.
    let claimed = store.confirm_pending("u1").await.unwrap().claimed().unwrap();
    assert_eq!(claimed.id, second.id);
    assert_eq!(claimed.summary, second.summary);
}

#[tokio::test]
async fn test_concurrent_creates_leave_one_awaiting_row() {
    // A file-backed store with a real connection pool: racing creates
    // run on separate connections, which is where the singleton can
    // break if supersede and insert don't commit together.
    let path = std::env::temp_dir().join(format!(
        "attache-pending-race-{}.db",
        uuid::Uuid::new_v4()
    ));
    let store = Store::new(&MemoryConfig {
        db_path: path.to_string_lossy().into_owned(),
        ..Default::default()
    })
    .await
    .unwrap();

    let mut handles = Vec::new();
    for i in 0..6 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .create_pending(
                    "u1",
                    &task_decision(&format!("delete report {i}"), TaskOp::Delete),
                    120,
                )
                .await
                .unwrap()
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let (awaiting,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM pending_confirmations \
         WHERE user_id = ? AND state = 'awaiting'",
    )
    .bind("u1")
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(awaiting, 1);

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[tokio::test]
async fn test_expired_pending_cannot_be_confirmed() {
    let store = Store::in_memory().await.unwrap();
    let pending = store
        .create_pending("u1", &task_decision("delete x", TaskOp::Delete), 0)
        .await
        .unwrap();

    // The late "yes" learns the action was dropped, not silence.
    let outcome = store.confirm_pending("u1").await.unwrap();
    match outcome {
        ClaimOutcome::Expired(dropped) => assert_eq!(dropped.id, pending.id),
        other => panic!("expected expiry, got {other:?}"),
    }
    assert_eq!(
        store.confirmation_state(&pending.id).await.unwrap().as_deref(),
        Some("expired")
    );
}

#[tokio::test]
async fn test_pending_is_per_user() {
    let store = Store::in_memory().await.unwrap();
    store
        .create_pending("u1", &task_decision("delete x", TaskOp::Delete), 120)
        .await
        .unwrap();

    assert!(store.get_awaiting("u2").await.unwrap().is_none());
    assert!(matches!(
        store.confirm_pending("u2").await.unwrap(),
        ClaimOutcome::Nothing
    ));
    assert!(store.get_awaiting("u1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_racing_confirms_one_winner() {
    let store = Store::in_memory().await.unwrap();
    store
        .create_pending("u1", &task_decision("delete x", TaskOp::Delete), 120)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.confirm_pending("u1").await.unwrap().claimed().is_some()
        }));
    }
    let mut winners = 0;
    for h in handles {
        if h.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_pending_roundtrips_intent_payload() {
    let store = Store::in_memory().await.unwrap();
    let decision = IntentDecision {
        payload: IntentPayload::Note(NotePayload {
            content: "garage code 4821".into(),
            tags: vec!["home".into()],
        }),
        confidence: 0.6,
        summary: "Save note".into(),
        ambiguous: false,
    };
    store.create_pending("u1", &decision, 120).await.unwrap();

    let awaiting = store.get_awaiting("u1").await.unwrap().unwrap();
    match awaiting.decision.payload {
        IntentPayload::Note(n) => assert_eq!(n.content, "garage code 4821"),
        other => panic!("wrong payload: {other:?}"),
    }
}

// --- interaction log ---

#[tokio::test]
async fn test_recent_context_ordered_and_capped() {
    let store = Store::in_memory().await.unwrap();
    for i in 0..5 {
        store
            .log_interaction(
                "u1",
                "telegram",
                &format!("msg {i}"),
                &format!("reply {i}"),
                "chat",
                0.9,
                Some("groq/test"),
            )
            .await
            .unwrap();
    }

    let ctx = store.recent_context("u1", 3).await.unwrap();
    assert_eq!(ctx.len(), 3);
    // Oldest of the window first.
    assert_eq!(ctx[0].user_text, "msg 2");
    assert_eq!(ctx[2].user_text, "msg 4");
}

#[tokio::test]
async fn test_recent_context_isolated_per_user() {
    let store = Store::in_memory().await.unwrap();
    store
        .log_interaction("u1", "telegram", "hi", "hello", "chat", 0.9, None)
        .await
        .unwrap();
    assert!(store.recent_context("u2", 10).await.unwrap().is_empty());
}

// --- tasks ---

#[tokio::test]
async fn test_task_create_and_list() {
    let store = Store::in_memory().await.unwrap();
    store
        .create_task("u1", "buy milk today", Some("2026-02-18 09:00:00"), 1, None, None)
        .await
        .unwrap();
    store
        .create_task("u1", "call the dentist", None, 2, None, None)
        .await
        .unwrap();

    let tasks = store.pending_tasks("u1").await.unwrap();
    assert_eq!(tasks.len(), 2);
    // Dated tasks come before undated ones.
    assert_eq!(tasks[0].title, "buy milk today");
}

#[tokio::test]
async fn test_find_similar_task_by_fuzzy_title() {
    let store = Store::in_memory().await.unwrap();
    store
        .create_task("u1", "buy milk tomorrow morning", None, 0, None, None)
        .await
        .unwrap();

    let similar = store.find_similar_task("u1", "buy milk tomorrow").await.unwrap();
    assert_eq!(similar.as_deref(), Some("buy milk tomorrow morning"));
    assert!(store
        .find_similar_task("u1", "walk the dog tonight")
        .await
        .unwrap()
        .is_none());

    // Create itself never deduplicates; the caller decides.
    store
        .create_task("u1", "buy milk tomorrow", None, 0, None, None)
        .await
        .unwrap();
    assert_eq!(store.pending_tasks("u1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_task_complete_by_fuzzy_title() {
    let store = Store::in_memory().await.unwrap();
    store
        .create_task("u1", "call the dentist office", None, 0, None, None)
        .await
        .unwrap();

    let done = store.complete_task("u1", "dentist").await.unwrap();
    assert_eq!(done.as_deref(), Some("call the dentist office"));
    assert!(store.pending_tasks("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_task_complete_all() {
    let store = Store::in_memory().await.unwrap();
    store.create_task("u1", "task one here", None, 0, None, None).await.unwrap();
    store.create_task("u1", "task two there", None, 0, None, None).await.unwrap();
    assert_eq!(store.complete_all_tasks("u1").await.unwrap(), 2);
    assert_eq!(store.complete_all_tasks("u1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_task_delete_no_match() {
    let store = Store::in_memory().await.unwrap();
    assert!(store.delete_task("u1", "ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_task_edit_updates_fields() {
    let store = Store::in_memory().await.unwrap();
    store
        .create_task("u1", "review quarterly report", None, 0, None, None)
        .await
        .unwrap();

    let edited = store
        .edit_task("u1", "quarterly report", None, Some("2026-03-01 10:00:00"), Some(2))
        .await
        .unwrap();
    assert!(edited.is_some());

    let tasks = store.pending_tasks("u1").await.unwrap();
    assert_eq!(tasks[0].due_date.as_deref(), Some("2026-03-01 10:00:00"));
    assert_eq!(tasks[0].priority, 2);
}

// --- notes ---

#[tokio::test]
async fn test_note_save_and_search() {
    let store = Store::in_memory().await.unwrap();
    store
        .create_note("u1", "wifi password is hunter2", &["home".into()])
        .await
        .unwrap();
    store
        .create_note("u1", "parking spot 14B", &[])
        .await
        .unwrap();

    let hits = store.search_notes("u1", "wifi", 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].0.contains("hunter2"));

    let by_tag = store.search_notes("u1", "home", 10).await.unwrap();
    assert_eq!(by_tag.len(), 1);
}
