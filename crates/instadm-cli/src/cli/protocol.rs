use anyhow::{bail, Result};

/// CLI command parsed from arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Print conversations, most recent first
    ListConversations,
    /// Print the messages of one conversation
    ListMessages { conversation_id: String },
    /// Print the AI responder config
    ShowConfig,
    /// Follow the live view of the configured store
    Watch { select: Option<String> },
    /// Follow the live view of a seeded in-memory store
    Demo,
}

/// One line typed on stdin while watching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchInput {
    Select(String),
    Clear,
    ConfigChanged,
    Quit,
}

impl WatchInput {
    /// Parse a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let input = match verb {
            "select" => match words.next() {
                Some(id) => WatchInput::Select(id.to_string()),
                None => bail!("usage: select <conversation_id>"),
            },
            "clear" => WatchInput::Clear,
            "config-changed" => WatchInput::ConfigChanged,
            "quit" | "exit" => WatchInput::Quit,
            other => bail!(
                "unknown command '{}' (expected select <id>, clear, config-changed, quit)",
                other
            ),
        };

        if words.next().is_some() {
            bail!("unexpected arguments after '{}'", verb);
        }
        Ok(Some(input))
    }
}
