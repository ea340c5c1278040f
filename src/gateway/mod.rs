//! Socket endpoint: authentication, connection bookkeeping, wire protocol
//! and the inbound-op dispatcher (§4.5, §6.1).

pub mod auth;
pub mod connection;
pub mod handlers;
pub mod protocol;

pub use handlers::{run_private_balance_router, websocket_handler, AppState};
