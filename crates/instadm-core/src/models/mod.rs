pub mod ai_config;
pub mod conversation;
pub mod message;

pub use ai_config::{AiConfig, AiConfigRow};
pub use conversation::{sort_by_activity, Conversation};
pub use message::{sort_chronologically, Message};
