use super::types::{TgResponse, TgUpdate};

#[test]
fn test_get_updates_text_message() {
    let json = r#"{
        "ok": true,
        "result": [{
            "update_id": 900100,
            "message": {
                "message_id": 55,
                "from": {"id": 42, "first_name": "Shay", "username": "shay"},
                "chat": {"id": 42, "type": "private"},
                "text": "add buy milk to my tasks"
            }
        }]
    }"#;

    let resp: TgResponse<Vec<TgUpdate>> = serde_json::from_str(json).unwrap();
    assert!(resp.ok);
    let updates = resp.result.unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].update_id, 900100);

    let msg = updates[0].message.as_ref().unwrap();
    assert_eq!(msg.text.as_deref(), Some("add buy milk to my tasks"));
    assert_eq!(msg.chat.chat_type, "private");
    assert_eq!(msg.from.as_ref().unwrap().id, 42);
}

#[test]
fn test_get_updates_voice_message() {
    let json = r#"{
        "ok": true,
        "result": [{
            "update_id": 900101,
            "message": {
                "message_id": 56,
                "from": {"id": 42, "first_name": "Shay"},
                "chat": {"id": 42, "type": "private"},
                "voice": {"file_id": "AwACAg", "duration": 4, "mime_type": "audio/ogg"}
            }
        }]
    }"#;

    let resp: TgResponse<Vec<TgUpdate>> = serde_json::from_str(json).unwrap();
    let updates = resp.result.unwrap();
    let msg = updates[0].message.as_ref().unwrap();
    assert!(msg.text.is_none());
    let voice = msg.voice.as_ref().unwrap();
    assert_eq!(voice.file_id, "AwACAg");
    assert_eq!(voice.duration, 4);
}

#[test]
fn test_api_error_response() {
    let json = r#"{"ok": false, "description": "Unauthorized"}"#;
    let resp: TgResponse<Vec<TgUpdate>> = serde_json::from_str(json).unwrap();
    assert!(!resp.ok);
    assert_eq!(resp.description.as_deref(), Some("Unauthorized"));
}

#[test]
fn test_update_without_message_is_tolerated() {
    let json = r#"{"ok": true, "result": [{"update_id": 900102}]}"#;
    let resp: TgResponse<Vec<TgUpdate>> = serde_json::from_str(json).unwrap();
    assert!(resp.result.unwrap()[0].message.is_none());
}
