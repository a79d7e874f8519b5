use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbound DM or bot reply, as stored in the `messages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub message_text: Option<String>,
    /// Reply generated by the responder for this message, if any
    #[serde(default)]
    pub ai_response: Option<String>,
    /// `true` when the human on the other end sent it, `false` for the bot
    pub is_from_user: bool,
    /// Delivery status tag (pending, sent, failed, ...)
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// Sort messages oldest first. Stable, so equal timestamps keep store order.
pub fn sort_chronologically(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.created_at);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_row() {
        let json = r#"{
            "id": "m1",
            "conversation_id": "c1",
            "message_text": "Oi!",
            "ai_response": null,
            "is_from_user": true,
            "status": "received",
            "created_at": "2024-01-02T00:00:00+00:00",
            "sender_name": "maria"
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.conversation_id, "c1");
        assert!(message.is_from_user);
        assert_eq!(message.message_text.as_deref(), Some("Oi!"));
        assert!(message.ai_response.is_none());
    }

    #[test]
    fn test_parse_bot_reply_row() {
        let json = r#"{
            "id": "m2",
            "conversation_id": "c1",
            "ai_response": "Olá, como posso ajudar?",
            "is_from_user": false,
            "status": "sent",
            "created_at": "2024-01-02T00:00:05Z"
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert!(message.message_text.is_none());
        assert_eq!(message.ai_response.as_deref(), Some("Olá, como posso ajudar?"));
        assert!(message.sender_name.is_none());
    }

    #[test]
    fn test_sort_chronologically() {
        let make = |id: &str, at: &str| Message {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            message_text: None,
            ai_response: None,
            is_from_user: true,
            status: "sent".to_string(),
            created_at: at.parse().unwrap(),
            sender_name: None,
        };
        let mut messages = vec![
            make("m3", "2024-01-03T00:00:00Z"),
            make("m1", "2024-01-01T00:00:00Z"),
            make("m2", "2024-01-01T00:00:00Z"),
        ];

        sort_chronologically(&mut messages);

        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }
}
