use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use instadm_core::models::AiConfig;
use instadm_core::{
    ChangeFeed, ChangeHub, DataSource, RestDataSource, SyncConfig, SyncHandle, SyncNotice,
    SyncRuntime,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::demo::run_demo;
use super::output::{format_notice, write_json};
use super::protocol::{CliCommand, WatchInput};

pub async fn run_command(command: CliCommand, config: &SyncConfig, pretty: bool) -> Result<()> {
    let mut stdout = std::io::stdout();

    match command {
        CliCommand::ListConversations => {
            let source = RestDataSource::from_config(config)?;
            let conversations = source
                .list_conversations()
                .await
                .context("Failed to load conversations")?;
            write_json(&mut stdout, &conversations, pretty)
        }
        CliCommand::ListMessages { conversation_id } => {
            let source = RestDataSource::from_config(config)?;
            let messages = source
                .list_messages(&conversation_id)
                .await
                .context("Failed to load messages")?;
            write_json(&mut stdout, &messages, pretty)
        }
        CliCommand::ShowConfig => {
            let source = RestDataSource::from_config(config)?;
            let ai_config = match source.read_ai_config().await {
                Ok(ai_config) => ai_config,
                Err(e) => {
                    warn!("Failed to load AI config, showing defaults: {}", e);
                    AiConfig::default()
                }
            };
            write_json(&mut stdout, &ai_config, pretty)
        }
        CliCommand::Watch { select } => {
            let source: Arc<dyn DataSource> = Arc::new(RestDataSource::from_config(config)?);
            // No realtime transport for the remote store: the view moves on
            // stdin commands only.
            let feed: Arc<dyn ChangeFeed> = Arc::new(ChangeHub::new());
            let stdin = BufReader::new(tokio::io::stdin());
            watch_view(source, feed, select, stdin, &mut stdout, pretty).await
        }
        CliCommand::Demo => run_demo(&mut stdout, pretty).await,
    }
}

/// Run the sync runtime, printing every published view until `quit` or end of input.
pub async fn watch_view<R, W>(
    source: Arc<dyn DataSource>,
    feed: Arc<dyn ChangeFeed>,
    select: Option<String>,
    input: R,
    out: &mut W,
    pretty: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (mut runtime, handle) = SyncRuntime::new(source, feed);
    let notices = runtime
        .take_notice_rx()
        .context("Notice receiver already taken")?;
    let task = tokio::spawn(runtime.run());

    let followed = follow_view(&handle, notices, select, input, out, pretty).await;

    let _ = handle.shutdown();
    task.await.context("Sync runtime task failed")?;
    followed
}

async fn follow_view<R, W>(
    handle: &SyncHandle,
    mut notices: mpsc::UnboundedReceiver<SyncNotice>,
    select: Option<String>,
    input: R,
    out: &mut W,
    pretty: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if select.is_some() {
        handle
            .select_conversation(select)
            .context("Sync runtime stopped")?;
    }

    let mut snapshots = handle.watch();
    let initial = snapshots.borrow_and_update().clone();
    write_json(out, &*initial, pretty)?;

    let mut lines = input.lines();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let snapshot = snapshots.borrow_and_update().clone();
                write_json(out, &*snapshot, pretty)?;
            }
            Some(notice) = notices.recv() => {
                eprintln!("{}", format_notice(&notice));
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    info!("Input closed, stopping");
                    return Ok(());
                };
                match WatchInput::parse(&line) {
                    Ok(Some(WatchInput::Quit)) => return Ok(()),
                    Ok(Some(input)) => apply_input(handle, input)?,
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e),
                }
            }
        }
    }
}

fn apply_input(handle: &SyncHandle, input: WatchInput) -> Result<()> {
    let sent = match input {
        WatchInput::Select(id) => handle.select_conversation(Some(id)),
        WatchInput::Clear => handle.select_conversation(None),
        WatchInput::ConfigChanged => handle.config_changed(),
        WatchInput::Quit => Ok(()),
    };
    sent.context("Sync runtime stopped")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::demo::seed_store;
    use instadm_core::Collection;

    fn lines(out: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_watch_prints_initial_view_and_quits() {
        let store = seed_store();
        let mut out = Vec::new();

        watch_view(store.clone(), store.clone(), None, &b"quit\n"[..], &mut out, false)
            .await
            .unwrap();

        let views = lines(&out);
        assert!(!views.is_empty());
        assert!(views[0].get("revision").is_some());
        assert!(views[0]["selected_id"].is_null());
        assert_eq!(store.hub().subscriber_count(Collection::Conversations), 0);
        assert_eq!(store.hub().subscriber_count(Collection::Messages), 0);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_watch_output_error_still_stops_runtime() {
        let store = seed_store();

        let result = watch_view(
            store.clone(),
            store.clone(),
            None,
            &b""[..],
            &mut BrokenPipe,
            false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(store.hub().subscriber_count(Collection::Conversations), 0);
        assert_eq!(store.hub().subscriber_count(Collection::Messages), 0);
    }

    #[tokio::test]
    async fn test_watch_stops_at_end_of_input() {
        let store = seed_store();
        let mut out = Vec::new();

        watch_view(
            store.clone(),
            store.clone(),
            Some("c1".to_string()),
            &b"bogus\n\nclear\n"[..],
            &mut out,
            true,
        )
        .await
        .unwrap();

        assert!(!out.is_empty());
        assert_eq!(store.hub().subscriber_count(Collection::Conversations), 0);
        assert_eq!(store.hub().subscriber_count(Collection::Messages), 0);
    }
}
