use tracing::{debug, warn};

use crate::data::FetchError;
use crate::models::{AiConfig, Conversation, Message};
use crate::notify::{ChangeEvent, Collection};
use crate::store::{Stream, StreamPhase, ViewState};

use super::events::SyncNotice;

/// Identifies one issued fetch. Only the newest ticket of a stream is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// A read the runtime should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Conversations {
        ticket: Ticket,
    },
    Messages {
        ticket: Ticket,
        conversation_id: String,
    },
    AiConfig {
        ticket: Ticket,
    },
}

impl FetchRequest {
    pub fn stream(&self) -> Stream {
        match self {
            FetchRequest::Conversations { .. } => Stream::Conversations,
            FetchRequest::Messages { .. } => Stream::Messages,
            FetchRequest::AiConfig { .. } => Stream::AiConfig,
        }
    }

    pub fn ticket(&self) -> Ticket {
        match self {
            FetchRequest::Conversations { ticket }
            | FetchRequest::Messages { ticket, .. }
            | FetchRequest::AiConfig { ticket } => *ticket,
        }
    }
}

/// The result of a [`FetchRequest`], tagged with the ticket it was issued under
#[derive(Debug)]
pub enum FetchOutcome {
    Conversations {
        ticket: Ticket,
        result: Result<Vec<Conversation>, FetchError>,
    },
    Messages {
        ticket: Ticket,
        conversation_id: String,
        result: Result<Vec<Message>, FetchError>,
    },
    AiConfig {
        ticket: Ticket,
        result: Result<AiConfig, FetchError>,
    },
}

/// Per-stream request bookkeeping.
///
/// At most one fetch per stream is tracked as in flight. Triggers that arrive
/// meanwhile collapse into a single queued follow-up; results carrying any
/// ticket but the in-flight one are stale.
#[derive(Debug, Default)]
struct Tracker {
    generation: u64,
    in_flight: Option<Ticket>,
    queued: bool,
}

impl Tracker {
    /// Start a fetch now, superseding whatever is in flight.
    fn issue(&mut self) -> Ticket {
        self.generation += 1;
        let ticket = Ticket(self.generation);
        self.in_flight = Some(ticket);
        self.queued = false;
        ticket
    }

    /// Start a fetch unless one is running, in which case queue one follow-up.
    fn request(&mut self) -> Option<Ticket> {
        if self.in_flight.is_some() {
            self.queued = true;
            return None;
        }
        Some(self.issue())
    }

    /// Forget the in-flight fetch; its result will be discarded as stale.
    fn reset(&mut self) {
        self.in_flight = None;
        self.queued = false;
    }

    /// `None` if `ticket` is stale, otherwise whether a follow-up was queued.
    fn settle(&mut self, ticket: Ticket) -> Option<bool> {
        if self.in_flight != Some(ticket) {
            return None;
        }
        self.in_flight = None;
        Some(std::mem::take(&mut self.queued))
    }
}

/// Decides what to fetch and how results land in the [`ViewState`].
///
/// Performs no I/O: every trigger returns the fetches to issue, and the
/// results come back through [`Reconciler::complete`].
#[derive(Debug, Default)]
pub struct Reconciler {
    view: ViewState,
    conversations: Tracker,
    messages: Tracker,
    ai_config: Tracker,
    pending_notices: Vec<SyncNotice>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Notices raised since the last drain, oldest first.
    pub fn drain_notices(&mut self) -> Vec<SyncNotice> {
        std::mem::take(&mut self.pending_notices)
    }

    /// Initial load: conversations and config.
    pub fn mount(&mut self) -> Vec<FetchRequest> {
        let mut requests = Vec::new();
        requests.extend(self.request_conversations());
        requests.extend(self.request_ai_config());
        requests
    }

    /// Change the selection. The previous conversation's messages are dropped
    /// right away, so the list never shows rows of another conversation.
    pub fn select_conversation(&mut self, id: Option<String>) -> Vec<FetchRequest> {
        if !self.view.set_selected_id(id.clone()) {
            return Vec::new();
        }

        match id {
            Some(conversation_id) => {
                let ticket = self.messages.issue();
                self.view.clear_messages();
                self.view.set_phase(Stream::Messages, StreamPhase::Loading);
                vec![FetchRequest::Messages {
                    ticket,
                    conversation_id,
                }]
            }
            None => {
                self.messages.reset();
                self.view.clear_messages();
                self.view.set_phase(Stream::Messages, StreamPhase::Empty);
                Vec::new()
            }
        }
    }

    /// The settings were written elsewhere; reload the config.
    pub fn config_changed(&mut self) -> Vec<FetchRequest> {
        self.request_ai_config().into_iter().collect()
    }

    /// React to a change notification.
    pub fn on_change(&mut self, event: &ChangeEvent) -> Vec<FetchRequest> {
        match event.collection {
            Collection::Conversations => self.request_conversations().into_iter().collect(),
            Collection::Messages => {
                let changed = event.conversation_ref();
                if changed.is_some() && changed == self.view.selected_id() {
                    return self.request_messages().into_iter().collect();
                }
                debug!(
                    "Ignoring {:?} message change for {:?} (selected {:?})",
                    event.kind,
                    changed,
                    self.view.selected_id()
                );
                Vec::new()
            }
        }
    }

    /// Apply a finished fetch and return any follow-up fetches.
    pub fn complete(&mut self, outcome: FetchOutcome) -> Vec<FetchRequest> {
        match outcome {
            FetchOutcome::Conversations { ticket, result } => {
                let Some(queued) = self.conversations.settle(ticket) else {
                    debug!("Discarding stale conversations result {:?}", ticket);
                    return Vec::new();
                };
                match result {
                    Ok(conversations) => {
                        self.view.replace_conversations(conversations);
                        self.view.set_phase(Stream::Conversations, StreamPhase::Loaded);
                    }
                    Err(e) => {
                        warn!("Error fetching conversations: {}", e);
                        self.view.set_phase(Stream::Conversations, StreamPhase::Failed);
                        self.pending_notices
                            .push(SyncNotice::fetch_failed(Stream::Conversations, &e));
                    }
                }
                if queued {
                    return self.request_conversations().into_iter().collect();
                }
                Vec::new()
            }
            FetchOutcome::Messages {
                ticket,
                conversation_id,
                result,
            } => {
                let Some(queued) = self.messages.settle(ticket) else {
                    debug!(
                        "Discarding stale messages result {:?} for {}",
                        ticket, conversation_id
                    );
                    return Vec::new();
                };
                match result {
                    Ok(messages) => {
                        self.view.replace_messages(messages);
                        self.view.set_phase(Stream::Messages, StreamPhase::Loaded);
                    }
                    Err(e) => {
                        warn!("Error fetching messages for {}: {}", conversation_id, e);
                        self.view.set_phase(Stream::Messages, StreamPhase::Failed);
                        self.pending_notices
                            .push(SyncNotice::fetch_failed(Stream::Messages, &e));
                    }
                }
                if queued {
                    return self.request_messages().into_iter().collect();
                }
                Vec::new()
            }
            FetchOutcome::AiConfig { ticket, result } => {
                let Some(queued) = self.ai_config.settle(ticket) else {
                    debug!("Discarding stale AI config result {:?}", ticket);
                    return Vec::new();
                };
                match result {
                    Ok(config) => {
                        self.view.replace_ai_config(config);
                        self.view.set_phase(Stream::AiConfig, StreamPhase::Loaded);
                    }
                    // Keep whatever config is active; a failed read must not flip auto-respond.
                    Err(e) => {
                        warn!("Error fetching AI config: {}", e);
                        self.view.set_phase(Stream::AiConfig, StreamPhase::Failed);
                    }
                }
                if queued {
                    return self.request_ai_config().into_iter().collect();
                }
                Vec::new()
            }
        }
    }

    fn request_conversations(&mut self) -> Option<FetchRequest> {
        let Some(ticket) = self.conversations.request() else {
            debug!("Conversations fetch in flight, queued a refetch");
            return None;
        };
        self.view.set_phase(Stream::Conversations, StreamPhase::Loading);
        Some(FetchRequest::Conversations { ticket })
    }

    fn request_messages(&mut self) -> Option<FetchRequest> {
        let conversation_id = self.view.selected_id()?.to_string();
        let Some(ticket) = self.messages.request() else {
            debug!("Messages fetch for {} in flight, queued a refetch", conversation_id);
            return None;
        };
        self.view.set_phase(Stream::Messages, StreamPhase::Loading);
        Some(FetchRequest::Messages {
            ticket,
            conversation_id,
        })
    }

    fn request_ai_config(&mut self) -> Option<FetchRequest> {
        let Some(ticket) = self.ai_config.request() else {
            debug!("AI config fetch in flight, queued a refetch");
            return None;
        };
        self.view.set_phase(Stream::AiConfig, StreamPhase::Loading);
        Some(FetchRequest::AiConfig { ticket })
    }
}
