use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::models::callback::CallbackData;
use crate::models::chat_event::{ChatCommand, ChatEvent};
use crate::models::game_session::GameKind;
use crate::models::player::{ChatId, MessageId, Player};
use crate::repositories::catalog::{ClubCatalog, DuelPool};
use crate::services::challenge_service::ChallengeService;
use crate::services::club_connect_service::ClubConnectService;
use crate::services::duel_service::DuelService;
use crate::services::errors::challenge_service_errors::ChallengeServiceError;
use crate::services::errors::game_service_errors::GameServiceError;
use crate::services::game_context::GameContext;
use crate::services::recovery_service::{RecoveryReport, RecoveryService};
use crate::services::stats_service::StatsService;

pub const HELP_TEXT: &str = "Club Connect: reply to someone with /ttt to challenge them. \
Pick a cell, then name a player who played for both clubs of that cell. \
Three in a row wins. You have 30 seconds per turn.\n\
/clubs shows the clubs of the current game.\n\
/cancel and /draw need both players to agree. /surrender ends the game at once.\n\
Duel: reply to someone with /duel. Five rounds, the fastest correct answer scores. \
/cancel_duel stops it.\n\
Stats: /ttt_mystats, /duel_mystats, /ttt_leaderboard, /duel_leaderboard, /ttt_history.";

/// Routes chat events to the handshake, the engines and the stats views.
pub struct GameHub {
    ctx: Arc<GameContext>,
    challenges: Arc<ChallengeService>,
    club_connect: Arc<ClubConnectService>,
    duel: Arc<DuelService>,
    stats: StatsService,
}

impl GameHub {
    pub fn new(ctx: Arc<GameContext>, catalog: Arc<ClubCatalog>, pool: Arc<DuelPool>) -> Self {
        GameHub {
            challenges: Arc::new(ChallengeService::new(ctx.clone())),
            club_connect: Arc::new(ClubConnectService::new(ctx.clone(), catalog)),
            duel: Arc::new(DuelService::new(ctx.clone(), pool)),
            stats: StatsService::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &Arc<GameContext> {
        &self.ctx
    }

    pub fn challenges(&self) -> &Arc<ChallengeService> {
        &self.challenges
    }

    pub fn club_connect(&self) -> &Arc<ClubConnectService> {
        &self.club_connect
    }

    pub fn duel(&self) -> &Arc<DuelService> {
        &self.duel
    }

    pub async fn recover(&self) -> Result<RecoveryReport, GameServiceError> {
        RecoveryService::new(
            self.ctx.clone(),
            self.club_connect.clone(),
            self.duel.clone(),
        )
        .recover()
        .await
    }

    /// Handles one event. Failures are answered to the acting player and never escape.
    pub async fn handle(&self, event: ChatEvent) {
        let chat_id = event.chat_id();
        let sender_id = event.sender().id;
        let result = match event {
            ChatEvent::Command {
                chat_id,
                is_group,
                sender,
                command,
                reply_to,
            } => {
                self.on_command(chat_id, is_group, &sender, command, reply_to.as_ref())
                    .await
            }
            ChatEvent::Callback {
                chat_id,
                message_id,
                sender,
                data,
            } => self.on_callback(chat_id, message_id, &sender, &data).await,
            ChatEvent::Text {
                chat_id,
                sender,
                text,
                sent_at,
            } => self
                .on_text(chat_id, &sender, &text, sent_at)
                .await
                .map_err(ChallengeServiceError::from),
        };

        if let Err(e) = result {
            if e.is_rejection() {
                debug!(chat_id, sender_id, error = %e, "Action rejected");
            } else {
                error!(chat_id, sender_id, error = %e, "Action failed");
            }
            self.ctx.reply(chat_id, sender_id, &e.user_message()).await;
        }
    }

    async fn on_command(
        &self,
        chat_id: ChatId,
        is_group: bool,
        sender: &Player,
        command: ChatCommand,
        reply_to: Option<&Player>,
    ) -> Result<(), ChallengeServiceError> {
        match command {
            ChatCommand::StartClubConnect => {
                if !self.club_connect.is_available() {
                    return Err(GameServiceError::DataUnavailable(
                        "the club list is not loaded".to_string(),
                    )
                    .into());
                }
                self.challenges
                    .propose(chat_id, is_group, GameKind::ClubConnect, sender, reply_to, false)
                    .await?;
            }
            ChatCommand::StartDuel => {
                if !self.duel.is_available() {
                    return Err(GameServiceError::DataUnavailable(
                        "the duel answers are not loaded".to_string(),
                    )
                    .into());
                }
                self.challenges
                    .propose(chat_id, is_group, GameKind::Duel, sender, reply_to, false)
                    .await?;
            }
            ChatCommand::Cancel => {
                self.club_connect.request_cancel(chat_id, sender.id).await?;
            }
            ChatCommand::Draw => {
                self.club_connect.request_draw(chat_id, sender.id).await?;
            }
            ChatCommand::Surrender => {
                self.club_connect.surrender(chat_id, sender.id).await?;
            }
            ChatCommand::CancelDuel => self.duel.cancel(chat_id, sender.id).await?,
            ChatCommand::Clubs => {
                let (rows, cols) = self.club_connect.clubs(chat_id).await?;
                let text = format!("Rows: {}\nColumns: {}", rows.join(" | "), cols.join(" | "));
                self.ctx.say(chat_id, &text).await;
            }
            ChatCommand::ClubConnectStats => {
                let text = self.stats.player_stats(GameKind::ClubConnect, sender).await?;
                self.ctx.say(chat_id, &text).await;
            }
            ChatCommand::DuelStats => {
                let text = self.stats.player_stats(GameKind::Duel, sender).await?;
                self.ctx.say(chat_id, &text).await;
            }
            ChatCommand::ClubConnectHistory => {
                let text = self.stats.history(chat_id).await?;
                self.ctx.say(chat_id, &text).await;
            }
            ChatCommand::ClubConnectLeaderboard => {
                let text = self.stats.leaderboard(GameKind::ClubConnect).await?;
                self.ctx.say(chat_id, &text).await;
            }
            ChatCommand::DuelLeaderboard => {
                let text = self.stats.leaderboard(GameKind::Duel).await?;
                self.ctx.say(chat_id, &text).await;
            }
            ChatCommand::Help => {
                self.ctx.say(chat_id, HELP_TEXT).await;
            }
            ChatCommand::Unknown(name) => {
                debug!(chat_id, command = %name, "Ignoring unknown command");
            }
        }
        Ok(())
    }

    async fn on_callback(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        sender: &Player,
        data: &str,
    ) -> Result<(), ChallengeServiceError> {
        let data: CallbackData = match data.parse() {
            Ok(data) => data,
            Err(e) => {
                warn!(chat_id, message_id, error = %e, "Ignoring malformed callback");
                return Ok(());
            }
        };

        match data {
            CallbackData::Accept(_) => {
                let challenge = self
                    .challenges
                    .accept(chat_id, message_id, sender.id)
                    .await?;
                match challenge.kind {
                    GameKind::ClubConnect => {
                        self.club_connect
                            .start(chat_id, &challenge.proposer, &challenge.target)
                            .await?;
                    }
                    GameKind::Duel => {
                        self.duel
                            .start(chat_id, &challenge.proposer, &challenge.target)
                            .await?;
                    }
                }
            }
            CallbackData::Decline(_) => {
                self.challenges
                    .decline(chat_id, message_id, sender.id)
                    .await?;
            }
            CallbackData::Cell(cell) => {
                self.club_connect
                    .select_cell(chat_id, message_id, sender.id, cell)
                    .await?;
            }
            CallbackData::Rematch { winner, loser } => {
                if sender.id != loser {
                    return Err(ChallengeServiceError::NotAllowed);
                }
                if let Err(e) = self.ctx.transport.clear_keyboard(chat_id, message_id).await {
                    warn!(chat_id, message_id, error = %e, "Failed to clear rematch button");
                }
                let opponent = self.ctx.transport.get_player(winner).await?;
                self.challenges
                    .propose(chat_id, true, GameKind::Duel, sender, Some(&opponent), true)
                    .await?;
            }
            CallbackData::Ignore => {}
        }
        Ok(())
    }

    /// Free text goes to Club Connect first, then to the duel.
    async fn on_text(
        &self,
        chat_id: ChatId,
        sender: &Player,
        text: &str,
        sent_at: i64,
    ) -> Result<(), GameServiceError> {
        if self
            .club_connect
            .submit_guess(chat_id, sender.id, text)
            .await?
            .is_some()
        {
            return Ok(());
        }
        self.duel
            .submit_guess(chat_id, sender.id, text, sent_at)
            .await?;
        Ok(())
    }
}
