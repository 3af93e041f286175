use std::sync::Arc;

use chrono::DateTime;

use crate::models::game_session::{GameKind, GameSession, GameStatus};
use crate::models::leaderboard::LeaderboardEntry;
use crate::models::player::{ChatId, Player};
use crate::services::errors::game_service_errors::GameServiceError;
use crate::services::game_context::GameContext;

pub const LEADERBOARD_SIZE: usize = 10;
pub const HISTORY_SIZE: usize = 5;

fn record_line(kind: GameKind, entry: &LeaderboardEntry) -> String {
    let mut line = format!("{}W {}D {}L", entry.wins, entry.draws, entry.losses);
    if kind.tracks_streak() && entry.win_streak >= 2 {
        line.push_str(&format!(", {}-win streak", entry.win_streak));
    }
    line
}

/// Read-only views over the leaderboard and finished games.
pub struct StatsService {
    ctx: Arc<GameContext>,
}

impl StatsService {
    pub fn new(ctx: Arc<GameContext>) -> Self {
        StatsService { ctx }
    }

    pub async fn leaderboard(&self, kind: GameKind) -> Result<String, GameServiceError> {
        let entries = self.ctx.leaderboard.top(kind, LEADERBOARD_SIZE).await?;
        if entries.is_empty() {
            return Ok(format!("No {} games have been played yet.", kind.title()));
        }

        let mut lines = vec![format!("{} leaderboard:", kind.title())];
        for (place, entry) in entries.iter().enumerate() {
            let name = self.ctx.mention(entry.player_id).await;
            lines.push(format!("{}. {}: {}", place + 1, name, record_line(kind, entry)));
        }
        Ok(lines.join("\n"))
    }

    pub async fn player_stats(&self, kind: GameKind, player: &Player) -> Result<String, GameServiceError> {
        let text = match self.ctx.leaderboard.stats(kind, player.id).await? {
            Some(entry) if entry.games_played() > 0 => format!(
                "{} in {}: {} games, {}",
                player.mention(),
                kind.title(),
                entry.games_played(),
                record_line(kind, &entry)
            ),
            _ => format!("{} has not played {} yet.", player.mention(), kind.title()),
        };
        Ok(text)
    }

    /// Latest finished Club Connect games in a chat, newest first.
    pub async fn history(&self, chat_id: ChatId) -> Result<String, GameServiceError> {
        let sessions = self
            .ctx
            .games
            .list_history_by_chat(chat_id, GameKind::ClubConnect, HISTORY_SIZE)
            .await?;
        if sessions.is_empty() {
            return Ok("No finished Club Connect games in this chat yet.".to_string());
        }

        let mut lines = vec!["Recent Club Connect games:".to_string()];
        for session in &sessions {
            lines.push(self.history_line(session).await);
        }
        Ok(lines.join("\n"))
    }

    async fn history_line(&self, session: &GameSession) -> String {
        let first = self.ctx.mention(session.player1_id).await;
        let second = self.ctx.mention(session.player2_id).await;
        let result = match (session.status, session.winner_id) {
            (GameStatus::Canceled, _) => "cancelled".to_string(),
            (_, Some(winner_id)) => format!("{} won", self.ctx.mention(winner_id).await),
            (_, None) => "draw".to_string(),
        };
        let when = session
            .ended_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        format!("{}: {} vs {}, {}", when, first, second, result)
    }
}
