use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use instadm_core::models::{AiConfigRow, Conversation, Message};
use instadm_core::store::StreamPhase;
use instadm_core::{MemoryStore, SyncHandle, SyncRuntime, ViewSnapshot};
use serde::Serialize;
use tokio::sync::watch;

use super::output::write_json;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct DemoStep<'a> {
    step: &'a str,
    snapshot: &'a ViewSnapshot,
}

fn conversation(id: &str, title: &str, last_message_at: Option<DateTime<Utc>>) -> Conversation {
    Conversation {
        id: id.to_string(),
        chat_id: format!("ig_{}", id),
        title: title.to_string(),
        last_message_at,
        account_id: Some("demo_account".to_string()),
    }
}

fn message(
    id: &str,
    conversation_id: &str,
    text: &str,
    is_from_user: bool,
    status: &str,
    created_at: DateTime<Utc>,
) -> Message {
    let (message_text, ai_response) = if is_from_user {
        (Some(text.to_string()), None)
    } else {
        (None, Some(text.to_string()))
    };
    Message {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        message_text,
        ai_response,
        is_from_user,
        status: status.to_string(),
        created_at,
        sender_name: None,
    }
}

/// A store with three conversations, one of them never active.
pub fn seed_store() -> Arc<MemoryStore> {
    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());

    store.upsert_conversation(conversation("c1", "Ana Souza", None));
    store.upsert_conversation(conversation("c2", "Bruno Lima", None));
    store.upsert_conversation(conversation("c3", "Carla Dias", None));

    store.insert_message(message(
        "m1",
        "c1",
        "Hi! Do you ship to Lisbon?",
        true,
        "received",
        now - chrono::Duration::minutes(30),
    ));
    store.insert_message(message(
        "m2",
        "c1",
        "Yes, we ship to Lisbon within 3 business days.",
        false,
        "sent",
        now - chrono::Duration::minutes(29),
    ));
    store.insert_message(message(
        "m3",
        "c2",
        "Thanks for the follow back!",
        true,
        "received",
        now - chrono::Duration::minutes(10),
    ));

    store.set_ai_config(AiConfigRow {
        auto_respond: false,
        system_prompt: "You answer questions about orders and shipping.".to_string(),
        auto_welcome: None,
        welcome_message: None,
    });

    store
}

async fn settle<F>(
    snapshots: &mut watch::Receiver<Arc<ViewSnapshot>>,
    step: &str,
    ready: F,
) -> Result<Arc<ViewSnapshot>>
where
    F: FnMut(&Arc<ViewSnapshot>) -> bool,
{
    let snapshot = tokio::time::timeout(STEP_TIMEOUT, snapshots.wait_for(ready))
        .await
        .with_context(|| format!("Timed out at demo step '{}'", step))?
        .context("Sync runtime stopped")?
        .clone();
    Ok(snapshot)
}

fn print_step<W: Write>(
    out: &mut W,
    step: &str,
    snapshot: &ViewSnapshot,
    pretty: bool,
) -> Result<()> {
    write_json(out, &DemoStep { step, snapshot }, pretty)
}

/// Drive the sync runtime over a seeded in-memory store, printing the view
/// after each simulated change.
pub async fn run_demo<W: Write>(out: &mut W, pretty: bool) -> Result<()> {
    let store = seed_store();
    let (runtime, handle) = SyncRuntime::new(store.clone(), store.clone());
    let task = tokio::spawn(runtime.run());

    let walked = walk_steps(&store, &handle, out, pretty).await;

    let _ = handle.shutdown();
    task.await.context("Sync runtime task failed")?;
    walked
}

async fn walk_steps<W: Write>(
    store: &MemoryStore,
    handle: &SyncHandle,
    out: &mut W,
    pretty: bool,
) -> Result<()> {
    let mut snapshots = handle.watch();

    let step = "mount";
    let view = settle(&mut snapshots, step, |s| {
        s.status.conversations == StreamPhase::Loaded && s.status.ai_config == StreamPhase::Loaded
    })
    .await?;
    print_step(out, step, &view, pretty)?;

    let step = "select c1";
    handle
        .select_conversation(Some("c1".to_string()))
        .context("Sync runtime stopped")?;
    let view = settle(&mut snapshots, step, |s| {
        s.selected_id.as_deref() == Some("c1")
            && s.status.messages == StreamPhase::Loaded
            && s.messages.len() == 2
    })
    .await?;
    print_step(out, step, &view, pretty)?;

    let step = "new message in c1";
    store.insert_message(message(
        "m4",
        "c1",
        "Great, and how much is shipping?",
        true,
        "pending",
        Utc::now(),
    ));
    let view = settle(&mut snapshots, step, |s| {
        s.messages.len() == 3 && s.conversations.first().map(|c| c.id.as_str()) == Some("c1")
    })
    .await?;
    print_step(out, step, &view, pretty)?;

    let step = "status update in c1";
    store.set_message_status("m4", "answered");
    let view = settle(&mut snapshots, step, |s| {
        s.messages.iter().any(|m| m.id == "m4" && m.status == "answered")
    })
    .await?;
    print_step(out, step, &view, pretty)?;

    let step = "new message in c2";
    store.insert_message(message(
        "m5",
        "c2",
        "Is the blue one back in stock?",
        true,
        "pending",
        Utc::now() + chrono::Duration::seconds(1),
    ));
    let view = settle(&mut snapshots, step, |s| {
        s.conversations.first().map(|c| c.id.as_str()) == Some("c2")
    })
    .await?;
    print_step(out, step, &view, pretty)?;

    let step = "config changed";
    store.set_ai_config(AiConfigRow {
        auto_respond: true,
        system_prompt: "You answer questions about orders and shipping.".to_string(),
        auto_welcome: Some(false),
        welcome_message: Some("Welcome!".to_string()),
    });
    handle.config_changed().context("Sync runtime stopped")?;
    let view = settle(&mut snapshots, step, |s| s.ai_config.auto_respond).await?;
    print_step(out, step, &view, pretty)?;

    let step = "clear selection";
    handle
        .select_conversation(None)
        .context("Sync runtime stopped")?;
    let view = settle(&mut snapshots, step, |s| {
        s.selected_id.is_none() && s.messages.is_empty()
    })
    .await?;
    print_step(out, step, &view, pretty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use instadm_core::DataSource;

    #[tokio::test]
    async fn test_seed_store_orders_by_activity() {
        let store = seed_store();
        let conversations = store.list_conversations().await.unwrap();
        let ids: Vec<&str> = conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1", "c3"]);

        let config = store.read_ai_config().await.unwrap();
        assert!(!config.auto_respond);
        assert!(config.auto_welcome);
        assert_eq!(config.welcome_message, "Olá! 👋 Muito obrigado por me seguir!");
    }

    #[tokio::test]
    async fn test_demo_walks_every_step() {
        let mut out = Vec::new();
        run_demo(&mut out, false).await.unwrap();

        let steps: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let names: Vec<&str> = steps.iter().map(|s| s["step"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "mount",
                "select c1",
                "new message in c1",
                "status update in c1",
                "new message in c2",
                "config changed",
                "clear selection",
            ]
        );

        let last = &steps[6]["snapshot"];
        assert!(last["selected_id"].is_null());
        assert_eq!(last["messages"].as_array().unwrap().len(), 0);
        assert_eq!(last["ai_config"]["welcome_message"], "Welcome!");
        assert_eq!(last["conversations"][0]["id"], "c2");
    }
}
