//! Players currently connected to the game server, with their admin levels.
//!
//! Filled from the plugin's join/leave events. It only answers "who is online
//! and at which level", so it starts empty and is never persisted.

use scc::HashMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlinePlayer {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub joined_at: i64,
}

pub struct Roster {
    players: HashMap<String, OnlinePlayer>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Record a player joining. A second join for the same id replaces the first.
    pub async fn join(&self, player: OnlinePlayer) {
        let _ = self.players.remove_async(&player.id).await;
        let _ = self.players.insert_async(player.id.clone(), player).await;
    }

    /// Record a player leaving, returning the entry if it was known.
    pub async fn leave(&self, id: &str) -> Option<OnlinePlayer> {
        self.players.remove_async(id).await.map(|(_, player)| player)
    }

    /// Connected players at or above `level`, sorted by name.
    pub async fn admins(&self, level: u32) -> Vec<OnlinePlayer> {
        let mut admins = Vec::new();
        self.players
            .iter_async(|_, player| {
                if player.level >= level {
                    admins.push(player.clone());
                }
                true
            })
            .await;
        admins.sort_by(|a, b| a.name.cmp(&b.name));
        admins
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}
