use serde::Serialize;

use crate::models::{sort_by_activity, sort_chronologically, AiConfig, Conversation, Message};

/// The three independently reconciled data categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Conversations,
    Messages,
    AiConfig,
}

/// Where a stream is in its fetch lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    Idle,
    /// Message stream only: nothing selected
    Empty,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub conversations: StreamPhase,
    pub messages: StreamPhase,
    pub ai_config: StreamPhase,
}

impl Default for StreamStatus {
    fn default() -> Self {
        Self {
            conversations: StreamPhase::Idle,
            messages: StreamPhase::Empty,
            ai_config: StreamPhase::Idle,
        }
    }
}

impl StreamStatus {
    fn slot(&mut self, stream: Stream) -> &mut StreamPhase {
        match stream {
            Stream::Conversations => &mut self.conversations,
            Stream::Messages => &mut self.messages,
            Stream::AiConfig => &mut self.ai_config,
        }
    }
}

/// Immutable copy of the view state handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub conversations: Vec<Conversation>,
    pub selected_id: Option<String>,
    pub messages: Vec<Message>,
    pub ai_config: AiConfig,
    pub status: StreamStatus,
    pub revision: u64,
}

impl ViewSnapshot {
    /// The selected conversation, resolved against the current list.
    pub fn selected_conversation(&self) -> Option<&Conversation> {
        let id = self.selected_id.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }
}

impl Default for ViewSnapshot {
    fn default() -> Self {
        ViewState::new().snapshot()
    }
}

/// Single source of truth for what the dashboard shows.
///
/// Every field is replaced wholesale; there is no partial mutation. Each change
/// bumps `revision`, which lets the runtime publish only when something moved.
#[derive(Debug, Clone)]
pub struct ViewState {
    conversations: Vec<Conversation>,
    selected_id: Option<String>,
    messages: Vec<Message>,
    ai_config: AiConfig,
    status: StreamStatus,
    revision: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            conversations: Vec::new(),
            selected_id: None,
            messages: Vec::new(),
            ai_config: AiConfig::default(),
            status: StreamStatus::default(),
            revision: 0,
        }
    }

    // ===== Getters =====

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn ai_config(&self) -> &AiConfig {
        &self.ai_config
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            conversations: self.conversations.clone(),
            selected_id: self.selected_id.clone(),
            messages: self.messages.clone(),
            ai_config: self.ai_config.clone(),
            status: self.status,
            revision: self.revision,
        }
    }

    // ===== Mutations =====

    /// Replace the whole list, enforcing most-recent-first order.
    pub fn replace_conversations(&mut self, mut conversations: Vec<Conversation>) {
        sort_by_activity(&mut conversations);
        self.conversations = conversations;
        self.bump();
    }

    /// Replace the messages of the selection, enforcing oldest-first order.
    pub fn replace_messages(&mut self, mut messages: Vec<Message>) {
        sort_chronologically(&mut messages);
        self.messages = messages;
        self.bump();
    }

    pub fn clear_messages(&mut self) {
        if !self.messages.is_empty() {
            self.messages = Vec::new();
            self.bump();
        }
    }

    pub fn replace_ai_config(&mut self, config: AiConfig) {
        self.ai_config = config;
        self.bump();
    }

    /// Returns `false` when `id` was already selected.
    pub fn set_selected_id(&mut self, id: Option<String>) -> bool {
        if self.selected_id == id {
            return false;
        }
        self.selected_id = id;
        self.bump();
        true
    }

    pub fn set_phase(&mut self, stream: Stream, phase: StreamPhase) {
        let slot = self.status.slot(stream);
        if *slot != phase {
            *slot = phase;
            self.bump();
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(id: &str, last_message_at: Option<&str>) -> Conversation {
        Conversation {
            id: id.to_string(),
            chat_id: format!("ig-{id}"),
            title: format!("Title {id}"),
            last_message_at: last_message_at.map(|s| s.parse().unwrap()),
            account_id: None,
        }
    }

    fn message(id: &str, at: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            message_text: None,
            ai_response: None,
            is_from_user: false,
            status: "sent".to_string(),
            created_at: at.parse().unwrap(),
            sender_name: None,
        }
    }

    #[test]
    fn test_new_state_uses_default_config() {
        let state = ViewState::new();
        assert_eq!(state.ai_config(), &AiConfig::default());
        assert_eq!(state.status().messages, StreamPhase::Empty);
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn test_replace_conversations_sorts() {
        let mut state = ViewState::new();
        state.replace_conversations(vec![
            conversation("c1", Some("2024-01-02T00:00:00Z")),
            conversation("c2", None),
            conversation("c3", Some("2024-01-03T00:00:00Z")),
        ]);

        let ids: Vec<&str> = state.conversations().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c1", "c2"]);
    }

    #[test]
    fn test_replace_messages_sorts() {
        let mut state = ViewState::new();
        state.replace_messages(vec![
            message("m2", "2024-01-02T00:00:00Z"),
            message("m1", "2024-01-01T00:00:00Z"),
        ]);

        let ids: Vec<&str> = state.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_revision_only_moves_on_change() {
        let mut state = ViewState::new();

        assert!(state.set_selected_id(Some("c1".to_string())));
        let after_select = state.revision();
        assert!(!state.set_selected_id(Some("c1".to_string())));
        assert_eq!(state.revision(), after_select);

        state.set_phase(Stream::Messages, StreamPhase::Loading);
        let after_phase = state.revision();
        state.set_phase(Stream::Messages, StreamPhase::Loading);
        assert_eq!(state.revision(), after_phase);

        state.clear_messages();
        assert_eq!(state.revision(), after_phase);
    }

    #[test]
    fn test_snapshot_resolves_selected_conversation() {
        let mut state = ViewState::new();
        state.replace_conversations(vec![conversation("c1", None), conversation("c2", None)]);
        state.set_selected_id(Some("c2".to_string()));

        let snapshot = state.snapshot();
        assert_eq!(
            snapshot.selected_conversation().map(|c| c.title.as_str()),
            Some("Title c2")
        );
        assert_eq!(snapshot.revision, state.revision());

        state.set_selected_id(Some("gone".to_string()));
        assert!(state.snapshot().selected_conversation().is_none());
    }
}
