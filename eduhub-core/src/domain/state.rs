use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-wide state of the platform connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Initializing,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Initializing => "Initializing",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Error => "Error",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three sub-services every backend collaborator depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceKind {
    DocumentStore,
    Identity,
    BlobStore,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [
        ServiceKind::DocumentStore,
        ServiceKind::Identity,
        ServiceKind::BlobStore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::DocumentStore => "documentStore",
            ServiceKind::Identity => "identity",
            ServiceKind::BlobStore => "blobStore",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded, non-resettable count of reconnection attempts.
///
/// `attempts_used` lives as long as the process; nothing resets it, so the
/// budget can be exhausted exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_attempts: u32,
    attempts_used: u32,
}

impl RetryBudget {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempts_used: 0,
        }
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    /// Records one attempt. Returns `false` once the count exceeds `max_attempts`.
    pub fn consume(&mut self) -> bool {
        self.attempts_used = self.attempts_used.saturating_add(1);
        self.attempts_used <= self.max_attempts
    }
}
