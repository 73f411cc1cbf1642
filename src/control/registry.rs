// Registry of AI players currently running, keyed by session id

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::network::StopHandle;

struct ActivePlayer {
    generation: u64,
    stop: StopHandle,
}

/// Shared map of running players
///
/// Each entry carries a generation so a finishing player only removes its
/// own entry, never one registered later for the same session id.
#[derive(Clone, Default)]
pub struct Registry {
    players: Arc<RwLock<HashMap<String, ActivePlayer>>>,
    next_generation: Arc<AtomicU64>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player unless one is already running for `session_id`.
    /// Returns the entry's generation, or `None` if the id was taken.
    pub async fn try_insert(&self, session_id: &str, stop: StopHandle) -> Option<u64> {
        let mut players = self.players.write().await;
        if players.contains_key(session_id) {
            return None;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        players.insert(session_id.to_string(), ActivePlayer { generation, stop });
        Some(generation)
    }

    /// Remove the entry for `session_id` if it still has `generation`
    pub async fn remove(&self, session_id: &str, generation: u64) -> bool {
        let mut players = self.players.write().await;
        match players.get(session_id) {
            Some(player) if player.generation == generation => {
                players.remove(session_id);
                true
            }
            _ => false,
        }
    }

    /// Ask the player for `session_id` to stop; false if none is running
    pub async fn stop(&self, session_id: &str) -> bool {
        match self.players.read().await.get(session_id) {
            Some(player) => {
                player.stop.stop();
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.players.read().await.contains_key(session_id)
    }

    /// Active session ids, sorted
    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.players.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
