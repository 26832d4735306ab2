//! Live-event fan-out for battle viewers.
//!
//! The [`Broadcaster`] keeps a registry of connected subscribers and
//! delivers lifecycle/timer/sentiment messages to all of them with
//! best-effort, at-most-once delivery: a failed write evicts the
//! connection, nothing is queued or replayed. Live-view updates are
//! superseded by the next message, so a miss costs nothing.

pub mod event;
pub mod registry;
pub mod server;

pub use event::LiveEvent;
pub use registry::{Broadcaster, ConnectionId};
pub use server::ws_router;
