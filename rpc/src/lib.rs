//! Thin HTTP surface over the battle engine.
//!
//! Routes validate input, call the manager, and map outcomes onto
//! status codes. Conflicts (`already_joined`, `battle_not_active`)
//! get specific 409 responses; absence on reads is a normal 200 with
//! null/empty, never an error.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{api_router, RpcServer, RpcState};
