use serde::Serialize;

use crate::data::FetchError;
use crate::store::Stream;

/// Transient, non-blocking message for the user (rendered as a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncNotice {
    pub stream: Stream,
    pub title: String,
    pub description: String,
    /// Underlying error, for logs and debug views
    pub detail: String,
}

impl SyncNotice {
    pub fn fetch_failed(stream: Stream, error: &FetchError) -> Self {
        let description = match stream {
            Stream::Conversations => "Failed to load conversations",
            Stream::Messages => "Failed to load messages",
            Stream::AiConfig => "Failed to load AI config",
        };
        Self {
            stream,
            title: "Error".to_string(),
            description: description.to_string(),
            detail: error.to_string(),
        }
    }
}
