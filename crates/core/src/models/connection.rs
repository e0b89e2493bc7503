use std::fmt;

use serde::{Deserialize, Serialize};

/// Readiness of the remote messaging channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Waiting for the operator to scan the pairing code.
    Pairing { qr_code: String },
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn qr_code(&self) -> Option<&str> {
        match self {
            ConnectionState::Pairing { qr_code } => Some(qr_code),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Pairing { .. } => write!(f, "pairing"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}
