//! Application-wide constants
//!
//! Centralized location for default values shared by the data layer,
//! the view state and the CLI.

/// System prompt used until the first successful config read
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful Instagram DM assistant. Respond professionally and concisely to messages.";

/// Welcome message used until the first successful config read
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Olá! 👋 Muito obrigado por me seguir! Estou aqui para ajudar. Como posso te ajudar hoje?";

/// Substituted when a stored config row has no `welcome_message`
pub const FALLBACK_WELCOME_MESSAGE: &str = "Olá! 👋 Muito obrigado por me seguir!";

/// Substituted when a stored config row has no `auto_welcome`
pub const FALLBACK_AUTO_WELCOME: bool = true;

// Store tables
pub const CONVERSATIONS_TABLE: &str = "conversations";
pub const MESSAGES_TABLE: &str = "messages";
pub const AI_CONFIG_TABLE: &str = "ai_config";

/// Request timeout applied to remote reads when the config does not set one
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
