use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A DM thread as stored in the `conversations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Instagram-side thread id
    pub chat_id: String,
    pub title: String,
    /// Most recent activity; `None` until the first message lands
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Sort conversations by last activity, most recent first.
///
/// Conversations without any activity trail all the others. The sort is stable,
/// so ties keep the order the store returned them in.
pub fn sort_by_activity(conversations: &mut [Conversation]) {
    // `None < Some(_)`, so comparing in reverse pushes the `None`s to the end.
    conversations.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
}
