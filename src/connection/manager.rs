use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    /// Steering producers (webcam tracker, phone).
    Input,
    /// Consumers of the merged value.
    Game,
}

impl ClientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRole::Input => "input",
            ClientRole::Game => "game",
        }
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleStats {
    pub count: usize,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub input_clients: usize,
    pub max_input_clients: usize,
    pub game_clients: usize,
    pub max_game_clients: usize,
}

#[derive(Debug, Default)]
struct Counts {
    input: usize,
    game: usize,
}

impl Counts {
    fn slot(&mut self, role: ClientRole) -> &mut usize {
        match role {
            ClientRole::Input => &mut self.input,
            ClientRole::Game => &mut self.game,
        }
    }
}

/// Admission gate for WebSocket clients, one ceiling per role.
pub struct ConnectionManager {
    max_input_clients: usize,
    max_game_clients: usize,
    counts: Mutex<Counts>,
}

impl ConnectionManager {
    pub fn new(max_input_clients: usize, max_game_clients: usize) -> Self {
        Self {
            max_input_clients,
            max_game_clients,
            counts: Mutex::new(Counts::default()),
        }
    }

    pub fn max_for(&self, role: ClientRole) -> usize {
        match role {
            ClientRole::Input => self.max_input_clients,
            ClientRole::Game => self.max_game_clients,
        }
    }

    /// Claim a slot for `role`. Returns false when the role is at capacity.
    pub async fn try_acquire(&self, role: ClientRole) -> bool {
        let max = self.max_for(role);
        let mut counts = self.counts.lock().await;
        let slot = counts.slot(role);
        if *slot >= max {
            return false;
        }
        *slot += 1;
        true
    }

    pub async fn release(&self, role: ClientRole) {
        let mut counts = self.counts.lock().await;
        let slot = counts.slot(role);
        if *slot == 0 {
            warn!("Release of {} slot with no active connections", role);
            return;
        }
        *slot -= 1;
    }

    pub async fn role_stats(&self, role: ClientRole) -> RoleStats {
        let mut counts = self.counts.lock().await;
        RoleStats {
            count: *counts.slot(role),
            max: self.max_for(role),
        }
    }

    pub async fn get_stats(&self) -> ConnectionStats {
        let counts = self.counts.lock().await;
        ConnectionStats {
            input_clients: counts.input,
            max_input_clients: self.max_input_clients,
            game_clients: counts.game,
            max_game_clients: self.max_game_clients,
        }
    }

    pub async fn is_full(&self, role: ClientRole) -> bool {
        let stats = self.role_stats(role).await;
        stats.count >= stats.max
    }
}
