use std::path::PathBuf;

use clap::{Parser, Subcommand};
use instadm_cli::cli::{load_config, run_command, CliCommand};
use instadm_core::tracing_setup::{init_tracing, TracingOptions};

#[derive(Parser)]
#[command(name = "instadm")]
#[command(about = "Inspect and follow the Instagram DM responder dashboard state")]
struct Cli {
    /// Path to JSON config file (restUrl, apiKey, requestTimeoutSecs)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    /// Log debug output on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List conversations, most recent activity first
    Conversations,

    /// List messages in a conversation, oldest first
    Messages {
        /// Conversation ID
        conversation_id: String,
    },

    /// Show the AI responder config
    Config,

    /// Follow the dashboard view; reads `select <id>`, `clear`,
    /// `config-changed` and `quit` from stdin
    Watch {
        /// Conversation to select on start
        #[arg(long)]
        select: Option<String>,
    },

    /// Follow the dashboard view over a seeded in-memory store
    Demo,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let tracing_options = TracingOptions {
        verbose: cli.verbose,
        log_file: cli.log_file.clone(),
    };
    if let Err(e) = init_tracing(&tracing_options) {
        eprintln!("Warning: {:#}", e);
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let command = match cli.command {
        Commands::Conversations => CliCommand::ListConversations,
        Commands::Messages { conversation_id } => CliCommand::ListMessages { conversation_id },
        Commands::Config => CliCommand::ShowConfig,
        Commands::Watch { select } => CliCommand::Watch { select },
        Commands::Demo => CliCommand::Demo,
    };

    if let Err(e) = run_command(command, &config, cli.pretty).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
