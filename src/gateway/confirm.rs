//! Confirmation-gate helpers.
//!
//! The persisted state machine lives in the store; this module decides
//! which decisions get gated and recognizes confirm/cancel replies in
//! Hebrew and English.

use attache_core::intent::{ActionType, IntentDecision};
use attache_memory::store::PendingAction;

const AFFIRMATIVES: &[&str] = &["כן", "yes", "y", "confirm", "אישור", "ok", "אוקיי"];
const NEGATIVES: &[&str] = &["לא", "no", "n", "cancel", "בטל", "לבטל"];

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(['!', '.', '?'])
        .to_lowercase()
}

/// Whether this message is a confirmation of a pending action.
pub(super) fn is_affirmative(text: &str) -> bool {
    AFFIRMATIVES.contains(&normalize(text).as_str())
}

/// Whether this message cancels a pending action.
pub(super) fn is_negative(text: &str) -> bool {
    NEGATIVES.contains(&normalize(text).as_str())
}

/// Whether a decision must be confirmed before dispatch.
///
/// Destructive task operations are always gated. Anything else (except
/// chat) is gated when the classifier wasn't confident enough.
pub(super) fn needs_confirmation(decision: &IntentDecision, confirm_threshold: f64) -> bool {
    decision.is_destructive()
        || (decision.action() != ActionType::Chat && decision.confidence < confirm_threshold)
}

/// The message asking the user to confirm a staged action.
pub(super) fn confirmation_prompt(pending: &PendingAction) -> String {
    format!(
        "⚠️ Please confirm: {}\n\nReply 'yes' / 'כן' to proceed, or 'no' / 'לא' to cancel. \
         This expires in 2 minutes.",
        pending.summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use attache_core::intent::{IntentPayload, NotePayload, TaskOp, TaskPayload};

    fn decision(payload: IntentPayload, confidence: f64) -> IntentDecision {
        IntentDecision {
            payload,
            confidence,
            summary: "do the thing".into(),
            ambiguous: false,
        }
    }

    #[test]
    fn test_affirmatives_both_languages() {
        for text in ["yes", " Yes!", "כן", "אישור", "confirm", "OK"] {
            assert!(is_affirmative(text), "{text}");
        }
        assert!(!is_affirmative("yes please add milk too"));
        assert!(!is_affirmative("maybe"));
    }

    #[test]
    fn test_negatives_both_languages() {
        for text in ["no", "No.", "לא", "בטל", "cancel"] {
            assert!(is_negative(text), "{text}");
        }
        assert!(!is_negative("november"));
    }

    #[test]
    fn test_destructive_always_gated() {
        let d = decision(
            IntentPayload::Task(TaskPayload {
                action: TaskOp::Delete,
                title: "old task".into(),
                ..Default::default()
            }),
            0.99,
        );
        assert!(needs_confirmation(&d, 0.75));
    }

    #[test]
    fn test_low_confidence_non_chat_gated() {
        let d = decision(
            IntentPayload::Note(NotePayload {
                content: "something".into(),
                tags: vec![],
            }),
            0.6,
        );
        assert!(needs_confirmation(&d, 0.75));
    }

    #[test]
    fn test_confident_create_not_gated() {
        let d = decision(
            IntentPayload::Task(TaskPayload {
                action: TaskOp::Create,
                title: "buy milk".into(),
                ..Default::default()
            }),
            0.9,
        );
        assert!(!needs_confirmation(&d, 0.75));
    }

    #[test]
    fn test_chat_never_gated() {
        let d = decision(IntentPayload::Chat, 0.1);
        assert!(!needs_confirmation(&d, 0.75));
    }
}
