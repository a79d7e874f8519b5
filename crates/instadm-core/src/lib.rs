pub mod config;
pub mod constants;
pub mod data;
pub mod models;
pub mod notify;
pub mod store;
pub mod sync;
pub mod tracing_setup;

pub use config::SyncConfig;
pub use data::{DataSource, FetchError, MemoryStore, RestDataSource};
pub use notify::{ChangeEvent, ChangeFeed, ChangeHub, Collection, NotifyError, Subscription};
pub use store::{ViewSnapshot, ViewState};
pub use sync::{Reconciler, SyncHandle, SyncNotice, SyncRuntime};
