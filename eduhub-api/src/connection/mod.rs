//! Lifecycle of the process's connection to the managed platform.
//!
//! [`ConnectionManager`] owns the connection state machine:
//!
//! ```text
//! Initializing ──ok──> Connected ──reconnect()──> Initializing ──probe──> Connected | Error
//!      └──retries spent──> Error ──reconnect()──┘
//! any ──teardown()──> Disconnected
//! ```
//!
//! Metrics: `platform_reconnect_attempts_total` and
//! `platform_state_transitions_total{state}`.

pub mod handles;
pub mod manager;

pub use handles::ServiceHandleFactory;
pub use manager::{ConnectionConfig, ConnectionManager};
