use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::data::DataSource;
use crate::notify::{ChangeEvent, ChangeFeed, Collection, Subscription};
use crate::store::ViewSnapshot;

use super::events::SyncNotice;
use super::reconciler::{FetchOutcome, FetchRequest, Reconciler};

/// Signals from the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCommand {
    SelectConversation(Option<String>),
    ConfigChanged,
    Shutdown,
}

/// Cloneable handle for driving a running [`SyncRuntime`] and reading its state.
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::UnboundedSender<SyncCommand>,
    snapshot_rx: watch::Receiver<Arc<ViewSnapshot>>,
}

impl SyncHandle {
    pub fn send(&self, command: SyncCommand) -> Result<(), mpsc::error::SendError<SyncCommand>> {
        self.command_tx.send(command)
    }

    pub fn select_conversation(
        &self,
        id: Option<String>,
    ) -> Result<(), mpsc::error::SendError<SyncCommand>> {
        self.send(SyncCommand::SelectConversation(id))
    }

    pub fn config_changed(&self) -> Result<(), mpsc::error::SendError<SyncCommand>> {
        self.send(SyncCommand::ConfigChanged)
    }

    pub fn shutdown(&self) -> Result<(), mpsc::error::SendError<SyncCommand>> {
        self.send(SyncCommand::Shutdown)
    }

    /// The most recently published view.
    pub fn snapshot(&self) -> Arc<ViewSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that wakes on every published view.
    pub fn watch(&self) -> watch::Receiver<Arc<ViewSnapshot>> {
        self.snapshot_rx.clone()
    }
}

/// Drives a [`Reconciler`] against a data source and a change feed.
///
/// Everything happens on the task that awaits [`SyncRuntime::run`]: commands,
/// notifications and fetch completions are handled one at a time, so the view
/// state is never touched concurrently.
pub struct SyncRuntime {
    source: Arc<dyn DataSource>,
    feed: Arc<dyn ChangeFeed>,
    reconciler: Reconciler,
    command_rx: mpsc::UnboundedReceiver<SyncCommand>,
    snapshot_tx: watch::Sender<Arc<ViewSnapshot>>,
    notice_tx: mpsc::UnboundedSender<SyncNotice>,
    notice_rx: Option<mpsc::UnboundedReceiver<SyncNotice>>,
    in_flight: FuturesUnordered<BoxFuture<'static, FetchOutcome>>,
    published_revision: u64,
}

async fn execute(source: Arc<dyn DataSource>, request: FetchRequest) -> FetchOutcome {
    match request {
        FetchRequest::Conversations { ticket } => FetchOutcome::Conversations {
            ticket,
            result: source.list_conversations().await,
        },
        FetchRequest::Messages {
            ticket,
            conversation_id,
        } => {
            let result = source.list_messages(&conversation_id).await;
            FetchOutcome::Messages {
                ticket,
                conversation_id,
                result,
            }
        }
        FetchRequest::AiConfig { ticket } => FetchOutcome::AiConfig {
            ticket,
            result: source.read_ai_config().await,
        },
    }
}

/// Next event of an optional subscription; pends forever when there is none.
async fn next_change(subscription: &mut Option<Subscription>) -> Option<ChangeEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

/// Drop a subscription whose feed went away.
fn feed_closed(subscription: &mut Option<Subscription>) {
    if let Some(closed) = subscription.take() {
        warn!(
            "{} change feed closed, no further live updates",
            closed.collection().table()
        );
    }
}

impl SyncRuntime {
    pub fn new(source: Arc<dyn DataSource>, feed: Arc<dyn ChangeFeed>) -> (Self, SyncHandle) {
        let reconciler = Reconciler::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(reconciler.view().snapshot()));
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let runtime = Self {
            source,
            feed,
            published_revision: reconciler.view().revision(),
            reconciler,
            command_rx,
            snapshot_tx,
            notice_tx,
            notice_rx: Some(notice_rx),
            in_flight: FuturesUnordered::new(),
        };
        let handle = SyncHandle {
            command_tx,
            snapshot_rx,
        };
        (runtime, handle)
    }

    /// User-facing notices. Can be taken once.
    pub fn take_notice_rx(&mut self) -> Option<mpsc::UnboundedReceiver<SyncNotice>> {
        self.notice_rx.take()
    }

    /// Run until [`SyncHandle::shutdown`] is called or every handle is dropped.
    pub async fn run(mut self) {
        info!("Sync runtime started");
        // Nobody took the notices; let sends fail instead of queueing forever.
        self.notice_rx = None;

        let mut conversations = self.subscribe(Collection::Conversations);
        let mut messages = self.subscribe(Collection::Messages);

        let requests = self.reconciler.mount();
        self.dispatch(requests);
        self.publish();

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let requests = match command {
                        Some(SyncCommand::SelectConversation(id)) => {
                            debug!("Selecting conversation {:?}", id);
                            self.reconciler.select_conversation(id)
                        }
                        Some(SyncCommand::ConfigChanged) => self.reconciler.config_changed(),
                        Some(SyncCommand::Shutdown) | None => break,
                    };
                    self.dispatch(requests);
                }
                Some(outcome) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    let requests = self.reconciler.complete(outcome);
                    self.dispatch(requests);
                }
                event = next_change(&mut conversations) => match event {
                    Some(event) => {
                        let requests = self.reconciler.on_change(&event);
                        self.dispatch(requests);
                    }
                    None => feed_closed(&mut conversations),
                },
                event = next_change(&mut messages) => match event {
                    Some(event) => {
                        let requests = self.reconciler.on_change(&event);
                        self.dispatch(requests);
                    }
                    None => feed_closed(&mut messages),
                },
            }

            self.flush_notices();
            self.publish();
        }

        if let Some(subscription) = conversations {
            subscription.unsubscribe();
        }
        if let Some(subscription) = messages {
            subscription.unsubscribe();
        }
        info!(
            "Sync runtime stopped ({} fetches abandoned)",
            self.in_flight.len()
        );
    }

    fn subscribe(&self, collection: Collection) -> Option<Subscription> {
        match self.feed.subscribe(collection) {
            Ok(subscription) => {
                info!("Subscribed to {} changes", collection.table());
                Some(subscription)
            }
            Err(e) => {
                warn!("Failed to subscribe to {} changes: {}", collection.table(), e);
                None
            }
        }
    }

    fn dispatch(&mut self, requests: Vec<FetchRequest>) {
        for request in requests {
            debug!("Fetching {:?} ({:?})", request.stream(), request.ticket());
            self.in_flight
                .push(execute(self.source.clone(), request).boxed());
        }
    }

    fn flush_notices(&mut self) {
        for notice in self.reconciler.drain_notices() {
            if self.notice_tx.send(notice).is_err() {
                debug!("Notice dropped, nobody is listening");
            }
        }
    }

    fn publish(&mut self) {
        let view = self.reconciler.view();
        if view.revision() == self.published_revision {
            return;
        }
        self.published_revision = view.revision();
        self.snapshot_tx.send_replace(Arc::new(view.snapshot()));
    }
}
