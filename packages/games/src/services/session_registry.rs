use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::models::game_session::{GameKind, GameSession};
use crate::models::player::ChatId;

/// In-memory home of one chat's session for one game.
///
/// Every read-validate-mutate-persist sequence runs with this lock held, timer
/// callbacks included. `None` means no game is running.
pub type SessionSlot = Arc<AsyncMutex<Option<GameSession>>>;

#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<(ChatId, GameKind), SessionSlot>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for a chat and game, created empty on first use.
    pub fn slot(&self, chat_id: ChatId, kind: GameKind) -> SessionSlot {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(slots.entry((chat_id, kind)).or_default())
    }

    pub async fn snapshot(&self, chat_id: ChatId, kind: GameKind) -> Option<GameSession> {
        let slot = self.slot(chat_id, kind);
        let guard = slot.lock().await;
        guard.clone()
    }

    pub async fn is_active(&self, chat_id: ChatId, kind: GameKind) -> bool {
        self.snapshot(chat_id, kind)
            .await
            .map_or(false, |session| session.is_active())
    }

    pub async fn active_sessions(&self) -> Vec<GameSession> {
        let slots: Vec<SessionSlot> = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();

        let mut sessions = Vec::new();
        for slot in slots {
            if let Some(session) = slot.lock().await.as_ref() {
                if session.is_active() {
                    sessions.push(session.clone());
                }
            }
        }
        sessions
    }
}
