//! Read access to the remote store.
//!
//! Everything the sync layer knows about the store goes through [`DataSource`]:
//! three reads, no writes. Failures come back as [`FetchError`] and the caller
//! decides whether to surface or swallow them.

pub mod memory;
pub mod rest;

use async_trait::async_trait;

use crate::models::{AiConfig, AiConfigRow, Conversation, Message};

pub use memory::MemoryStore;
pub use rest::RestDataSource;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Query failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode {what}: {message}")]
    Decode { what: &'static str, message: String },
    #[error("No {0} row found")]
    NotFound(&'static str),
}

#[async_trait]
pub trait DataSource: Send + Sync {
    /// All conversations, most recent activity first, never-active ones last.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, FetchError>;

    /// Messages of one conversation, oldest first.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, FetchError>;

    /// The singleton responder config, with fallbacks for absent columns.
    async fn read_ai_config(&self) -> Result<AiConfig, FetchError>;
}

/// Turn a stored config row into a full config, noting which columns were filled in.
pub(crate) fn config_from_row(row: AiConfigRow) -> AiConfig {
    let missing = row.missing_fields();
    if !missing.is_empty() {
        tracing::warn!(
            "ai_config row is missing {:?}, using built-in fallbacks",
            missing
        );
    }
    row.into_config()
}
