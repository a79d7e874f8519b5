pub mod view_state;

pub use view_state::{Stream, StreamPhase, StreamStatus, ViewSnapshot, ViewState};
