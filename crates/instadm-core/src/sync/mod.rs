//! Reconciliation of the view state with the remote store.
//!
//! [`Reconciler`] is the synchronous decision core: it takes triggers (mount,
//! selection, config-changed, change notifications, fetch completions) and
//! answers with the fetches to issue. [`SyncRuntime`] executes those fetches
//! against a [`DataSource`](crate::data::DataSource) and feeds the results back
//! in, all on a single task.

pub mod events;
pub mod reconciler;
pub mod runtime;

pub use events::SyncNotice;
pub use reconciler::{FetchOutcome, FetchRequest, Reconciler, Ticket};
pub use runtime::{SyncCommand, SyncHandle, SyncRuntime};
