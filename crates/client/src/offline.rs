//! Connectivity tracking for the identity and content backends.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Connectivity state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// The last exchange got a response (whatever its status).
    #[default]
    Online,
    /// The last exchange got no response at all.
    Offline,
}

/// Last known connectivity, shared by everything that talks to a backend.
///
/// Purely informational (offline banners, logs). Access decisions never
/// consult it.
#[derive(Debug, Default)]
pub struct OfflineMode {
    state: RwLock<ConnectivityState>,
}

impl OfflineMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark the client as offline.
    pub fn set_offline(&self) {
        self.set(ConnectivityState::Offline);
    }

    /// Mark the client as online.
    pub fn set_online(&self) {
        self.set(ConnectivityState::Online);
    }

    pub fn is_offline(&self) -> bool {
        self.state() == ConnectivityState::Offline
    }

    fn set(&self, next: ConnectivityState) {
        let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state != next {
            tracing::info!(from = ?*state, to = ?next, "connectivity changed");
            *state = next;
        }
    }
}
