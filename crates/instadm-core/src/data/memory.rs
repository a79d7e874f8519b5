use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use super::{config_from_row, DataSource, FetchError};
use crate::constants::AI_CONFIG_TABLE;
use crate::models::{
    sort_by_activity, sort_chronologically, AiConfig, AiConfigRow, Conversation, Message,
};
use crate::notify::{
    ChangeEvent, ChangeFeed, ChangeHub, ChangeKind, Collection, NotifyError, Subscription,
};

#[derive(Default)]
struct Tables {
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    ai_config: Option<AiConfigRow>,
}

/// Store kept entirely in memory.
///
/// Reads behave like the remote queries (same ordering, same fallbacks) and
/// every mutation is published to subscribers, so it stands in for the remote
/// store and its change feed at once.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    hub: ChangeHub,
    offline: AtomicBool,
}

fn to_row<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    /// While offline every read fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), FetchError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("store is offline".to_string()));
        }
        Ok(())
    }

    pub fn upsert_conversation(&self, conversation: Conversation) {
        let row = to_row(&conversation);
        let kind = {
            let mut tables = self.tables.write();
            match tables
                .conversations
                .iter_mut()
                .find(|c| c.id == conversation.id)
            {
                Some(existing) => {
                    *existing = conversation;
                    ChangeKind::Update
                }
                None => {
                    tables.conversations.push(conversation);
                    ChangeKind::Insert
                }
            }
        };
        self.hub
            .publish(ChangeEvent::new(Collection::Conversations, kind, row));
    }

    pub fn remove_conversation(&self, id: &str) -> Option<Conversation> {
        let removed = {
            let mut tables = self.tables.write();
            let index = tables.conversations.iter().position(|c| c.id == id)?;
            tables.conversations.remove(index)
        };
        if let Some(old) = to_row(&removed) {
            self.hub.publish(
                ChangeEvent::new(Collection::Conversations, ChangeKind::Delete, None)
                    .with_old(old),
            );
        }
        Some(removed)
    }

    /// Insert a message and advance its conversation's last activity.
    pub fn insert_message(&self, message: Message) {
        let message_row = to_row(&message);
        let touched = {
            let mut tables = self.tables.write();
            let touched = tables
                .conversations
                .iter_mut()
                .find(|c| c.id == message.conversation_id)
                .filter(|c| c.last_message_at.map_or(true, |at| at < message.created_at))
                .map(|c| {
                    c.last_message_at = Some(message.created_at);
                    c.clone()
                });
            tables.messages.push(message);
            touched
        };

        self.hub.publish(ChangeEvent::new(
            Collection::Messages,
            ChangeKind::Insert,
            message_row,
        ));
        if let Some(conversation) = touched {
            self.hub.publish(ChangeEvent::new(
                Collection::Conversations,
                ChangeKind::Update,
                to_row(&conversation),
            ));
        }
    }

    /// Move a message to a new status. Returns `false` when no such message exists.
    pub fn set_message_status(&self, id: &str, status: &str) -> bool {
        let updated = {
            let mut tables = self.tables.write();
            tables
                .messages
                .iter_mut()
                .find(|m| m.id == id)
                .map(|m| {
                    m.status = status.to_string();
                    m.clone()
                })
        };
        match updated {
            Some(message) => {
                self.hub.publish(ChangeEvent::new(
                    Collection::Messages,
                    ChangeKind::Update,
                    to_row(&message),
                ));
                true
            }
            None => false,
        }
    }

    /// Replace the config row. The config table is not watched, so nothing is published.
    pub fn set_ai_config(&self, row: AiConfigRow) {
        self.tables.write().ai_config = Some(row);
    }
}

#[async_trait]
impl DataSource for MemoryStore {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, FetchError> {
        self.ensure_online()?;
        let mut conversations = self.tables.read().conversations.clone();
        sort_by_activity(&mut conversations);
        Ok(conversations)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, FetchError> {
        self.ensure_online()?;
        let mut messages: Vec<Message> = self
            .tables
            .read()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        sort_chronologically(&mut messages);
        Ok(messages)
    }

    async fn read_ai_config(&self) -> Result<AiConfig, FetchError> {
        self.ensure_online()?;
        let row = self.tables.read().ai_config.clone();
        row.map(config_from_row)
            .ok_or(FetchError::NotFound(AI_CONFIG_TABLE))
    }
}

impl ChangeFeed for MemoryStore {
    fn subscribe(&self, collection: Collection) -> Result<Subscription, NotifyError> {
        self.hub.subscribe(collection)
    }
}
