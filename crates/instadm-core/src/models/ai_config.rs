use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_SYSTEM_PROMPT, DEFAULT_WELCOME_MESSAGE, FALLBACK_AUTO_WELCOME,
    FALLBACK_WELCOME_MESSAGE,
};

/// Responder settings. The store holds exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    pub auto_respond: bool,
    pub system_prompt: String,
    pub auto_welcome: bool,
    pub welcome_message: String,
}

impl Default for AiConfig {
    /// Client-side config shown before the first successful read.
    fn default() -> Self {
        Self {
            auto_respond: false,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            auto_welcome: true,
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
        }
    }
}

/// The `ai_config` row as it comes off the wire.
///
/// `auto_welcome` and `welcome_message` were added to the table later and may be
/// absent or null on older rows.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfigRow {
    pub auto_respond: bool,
    pub system_prompt: String,
    #[serde(default)]
    pub auto_welcome: Option<bool>,
    #[serde(default)]
    pub welcome_message: Option<String>,
}

impl AiConfigRow {
    /// Names of the optional columns this row is missing.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.auto_welcome.is_none() {
            missing.push("auto_welcome");
        }
        if self.welcome_message.is_none() {
            missing.push("welcome_message");
        }
        missing
    }

    /// Build the full config, substituting fallbacks for absent columns.
    pub fn into_config(self) -> AiConfig {
        AiConfig {
            auto_respond: self.auto_respond,
            system_prompt: self.system_prompt,
            auto_welcome: self.auto_welcome.unwrap_or(FALLBACK_AUTO_WELCOME),
            welcome_message: self
                .welcome_message
                .unwrap_or_else(|| FALLBACK_WELCOME_MESSAGE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_auto_respond_off() {
        let config = AiConfig::default();
        assert!(!config.auto_respond);
        assert!(config.auto_welcome);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.welcome_message, DEFAULT_WELCOME_MESSAGE);
    }

    #[test]
    fn test_full_row_maps_verbatim() {
        let json = r#"{
            "id": "cfg",
            "auto_respond": true,
            "system_prompt": "Be brief.",
            "auto_welcome": false,
            "welcome_message": "Hi!"
        }"#;
        let row: AiConfigRow = serde_json::from_str(json).unwrap();
        assert!(row.missing_fields().is_empty());

        let config = row.into_config();
        assert!(config.auto_respond);
        assert!(!config.auto_welcome);
        assert_eq!(config.system_prompt, "Be brief.");
        assert_eq!(config.welcome_message, "Hi!");
    }

    #[test]
    fn test_absent_columns_use_fallbacks() {
        let json = r#"{"auto_respond": true, "system_prompt": "Be brief.", "welcome_message": null}"#;
        let row: AiConfigRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.missing_fields(), vec!["auto_welcome", "welcome_message"]);

        let config = row.into_config();
        assert!(config.auto_respond);
        assert_eq!(config.auto_welcome, FALLBACK_AUTO_WELCOME);
        assert_eq!(config.welcome_message, FALLBACK_WELCOME_MESSAGE);
    }

    #[test]
    fn test_row_without_required_columns_is_rejected() {
        let json = r#"{"auto_welcome": true}"#;
        assert!(serde_json::from_str::<AiConfigRow>(json).is_err());
    }
}
