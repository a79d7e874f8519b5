pub mod commands;
pub mod config;
pub mod demo;
pub mod output;
pub mod protocol;

pub use commands::run_command;
pub use config::load_config;
pub use protocol::{CliCommand, WatchInput};
