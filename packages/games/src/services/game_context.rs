use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::GameConfig;
use crate::models::callback::InlineKeyboard;
use crate::models::game_session::{GameKind, GameSession};
use crate::models::player::{ChatId, MessageId, Player, PlayerId};
use crate::repositories::errors::game_repository_errors::GameRecordRepositoryError;
use crate::repositories::game_repository::GameRecordRepository;
use crate::repositories::leaderboard_repository::LeaderboardRepository;
use crate::services::chat_transport::ChatTransport;
use crate::services::session_registry::SessionRegistry;

const SAVE_FAILED_NOTICE: &str = "Could not save the game right now. Play continues.";

/// Collaborators shared by the handshake, both engines and the hub.
#[derive(Clone)]
pub struct GameContext {
    pub games: Arc<dyn GameRecordRepository + Send + Sync>,
    pub leaderboard: Arc<dyn LeaderboardRepository + Send + Sync>,
    pub transport: Arc<dyn ChatTransport + Send + Sync>,
    pub registry: Arc<SessionRegistry>,
    pub config: GameConfig,
}

impl GameContext {
    pub fn new(
        games: Arc<dyn GameRecordRepository + Send + Sync>,
        leaderboard: Arc<dyn LeaderboardRepository + Send + Sync>,
        transport: Arc<dyn ChatTransport + Send + Sync>,
        config: GameConfig,
    ) -> Self {
        GameContext {
            games,
            leaderboard,
            transport,
            registry: Arc::new(SessionRegistry::new()),
            config,
        }
    }

    // Store failures never roll back the in-memory session; the next good write catches up.

    pub async fn persist_new(&self, session: &GameSession) -> bool {
        match self.games.create_game(session).await {
            Ok(()) => true,
            Err(e) => {
                error!(game_id = %session.id, chat_id = session.chat_id, error = %e, "Failed to create game record");
                self.say(session.chat_id, SAVE_FAILED_NOTICE).await;
                false
            }
        }
    }

    /// Writes the latest state. A record whose create failed earlier is created now.
    pub async fn persist(&self, session: &GameSession) -> bool {
        let written = match self.games.update_game(session).await {
            Err(GameRecordRepositoryError::NotFound) => {
                info!(game_id = %session.id, chat_id = session.chat_id, "Game record missing, creating it");
                self.games.create_game(session).await
            }
            other => other,
        };
        match written {
            Ok(()) => true,
            Err(e) => {
                error!(game_id = %session.id, chat_id = session.chat_id, error = %e, "Failed to update game record");
                self.say(session.chat_id, SAVE_FAILED_NOTICE).await;
                false
            }
        }
    }

    pub async fn record_result(&self, kind: GameKind, winner_id: PlayerId, loser_id: PlayerId) {
        if let Err(e) = self.leaderboard.record_result(kind, winner_id, loser_id).await {
            error!(%kind, winner_id, loser_id, error = %e, "Failed to record result");
        }
    }

    pub async fn record_draw(&self, kind: GameKind, player_a: PlayerId, player_b: PlayerId) {
        if let Err(e) = self.leaderboard.record_draw(kind, player_a, player_b).await {
            error!(%kind, player_a, player_b, error = %e, "Failed to record draw");
        }
    }

    pub async fn say(&self, chat_id: ChatId, text: &str) -> Option<MessageId> {
        self.say_with(chat_id, text, None).await
    }

    pub async fn say_with(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Option<MessageId> {
        match self.transport.send_message(chat_id, text, keyboard).await {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to send message");
                None
            }
        }
    }

    pub async fn reply(&self, chat_id: ChatId, player_id: PlayerId, text: &str) {
        if let Err(e) = self.transport.reply_to_actor(chat_id, player_id, text).await {
            warn!(chat_id, player_id, error = %e, "Failed to reply to player");
        }
    }

    /// Display name for a player, falling back to the id when lookup fails.
    pub async fn mention(&self, player_id: PlayerId) -> String {
        match self.transport.get_player(player_id).await {
            Ok(player) => player.mention(),
            Err(_) => Player::new(player_id, "").mention(),
        }
    }
}
