use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::game_session::{GameKind, GameSession};
use crate::models::leaderboard::{rank_entries, LeaderboardEntry};
use crate::models::player::{ChatId, PlayerId};
use crate::repositories::errors::game_repository_errors::GameRecordRepositoryError;
use crate::repositories::errors::leaderboard_repository_errors::LeaderboardRepositoryError;
use crate::repositories::game_repository::{select_history, GameRecordRepository};
use crate::repositories::leaderboard_repository::LeaderboardRepository;

/// Process-local game table. Rows are stored exactly as they would be persisted.
#[derive(Default)]
pub struct InMemoryGameRecordRepository {
    rows: Mutex<HashMap<String, GameSession>>,
    fail_writes: AtomicBool,
}

impl InMemoryGameRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: Vec<GameSession>) -> Self {
        let rows = sessions
            .into_iter()
            .map(|s| (s.id.clone(), s.persisted()))
            .collect();
        InMemoryGameRecordRepository {
            rows: Mutex::new(rows),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent create/update fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), GameRecordRepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GameRecordRepositoryError::Storage(
                "writes are disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn rows(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, GameSession>>, GameRecordRepositoryError>
    {
        self.rows
            .lock()
            .map_err(|e| GameRecordRepositoryError::Storage(e.to_string()))
    }

    pub fn snapshot(&self) -> Vec<GameSession> {
        self.rows
            .lock()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GameRecordRepository for InMemoryGameRecordRepository {
    async fn create_game(&self, session: &GameSession) -> Result<(), GameRecordRepositoryError> {
        self.check_writable()?;
        let mut rows = self.rows()?;
        if rows.contains_key(&session.id) {
            return Err(GameRecordRepositoryError::Storage(format!(
                "game {} already exists",
                session.id
            )));
        }
        rows.insert(session.id.clone(), session.persisted());
        Ok(())
    }

    async fn update_game(&self, session: &GameSession) -> Result<(), GameRecordRepositoryError> {
        self.check_writable()?;
        let mut rows = self.rows()?;
        match rows.get_mut(&session.id) {
            Some(row) => {
                *row = session.persisted();
                Ok(())
            }
            None => Err(GameRecordRepositoryError::NotFound),
        }
    }

    async fn get_game(&self, id: &str) -> Result<GameSession, GameRecordRepositoryError> {
        self.rows()?
            .get(id)
            .cloned()
            .ok_or(GameRecordRepositoryError::NotFound)
    }

    async fn list_active_by_chat(
        &self,
        chat_id: ChatId,
        kind: GameKind,
    ) -> Result<Vec<GameSession>, GameRecordRepositoryError> {
        Ok(self
            .rows()?
            .values()
            .filter(|s| s.chat_id == chat_id && s.kind == kind && s.is_active())
            .cloned()
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<GameSession>, GameRecordRepositoryError> {
        let mut active: Vec<GameSession> = self
            .rows()?
            .values()
            .filter(|s| s.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|s| s.created_at);
        Ok(active)
    }

    async fn list_history_by_chat(
        &self,
        chat_id: ChatId,
        kind: GameKind,
        limit: usize,
    ) -> Result<Vec<GameSession>, GameRecordRepositoryError> {
        let sessions: Vec<GameSession> = self
            .rows()?
            .values()
            .filter(|s| s.chat_id == chat_id && s.kind == kind)
            .cloned()
            .collect();
        Ok(select_history(sessions, limit))
    }
}

#[derive(Default)]
pub struct InMemoryLeaderboardRepository {
    entries: Mutex<HashMap<String, LeaderboardEntry>>,
    fail_writes: AtomicBool,
}

impl InMemoryLeaderboardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn tally<F>(&self, kind: GameKind, player_id: PlayerId, apply: F) -> Result<(), LeaderboardRepositoryError>
    where
        F: FnOnce(&mut LeaderboardEntry),
    {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LeaderboardRepositoryError::Storage(
                "writes are disabled".to_string(),
            ));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| LeaderboardRepositoryError::Storage(e.to_string()))?;
        let entry = entries
            .entry(LeaderboardEntry::key(kind, player_id))
            .or_insert_with(|| LeaderboardEntry::new(kind, player_id));
        apply(entry);
        Ok(())
    }
}

#[async_trait]
impl LeaderboardRepository for InMemoryLeaderboardRepository {
    async fn record_result(
        &self,
        kind: GameKind,
        winner_id: PlayerId,
        loser_id: PlayerId,
    ) -> Result<(), LeaderboardRepositoryError> {
        self.tally(kind, winner_id, LeaderboardEntry::apply_win)?;
        self.tally(kind, loser_id, LeaderboardEntry::apply_loss)
    }

    async fn record_draw(
        &self,
        kind: GameKind,
        player_a: PlayerId,
        player_b: PlayerId,
    ) -> Result<(), LeaderboardRepositoryError> {
        self.tally(kind, player_a, LeaderboardEntry::apply_draw)?;
        self.tally(kind, player_b, LeaderboardEntry::apply_draw)
    }

    async fn top(
        &self,
        kind: GameKind,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardRepositoryError> {
        let mut entries: Vec<LeaderboardEntry> = self
            .entries
            .lock()
            .map_err(|e| LeaderboardRepositoryError::Storage(e.to_string()))?
            .values()
            .filter(|e| e.game_kind == kind)
            .cloned()
            .collect();
        rank_entries(kind, &mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn stats(
        &self,
        kind: GameKind,
        player_id: PlayerId,
    ) -> Result<Option<LeaderboardEntry>, LeaderboardRepositoryError> {
        Ok(self
            .entries
            .lock()
            .map_err(|e| LeaderboardRepositoryError::Storage(e.to_string()))?
            .get(&LeaderboardEntry::key(kind, player_id))
            .cloned())
    }
}
