use std::sync::Arc;

use tracing::{error, info, warn};

use crate::models::game_session::{now_ts, GameKind, GameSession};
use crate::services::club_connect_service::ClubConnectService;
use crate::services::duel_service::DuelService;
use crate::services::errors::game_service_errors::GameServiceError;
use crate::services::game_context::GameContext;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub restored: usize,
    pub failed: usize,
}

/// Reloads active games after a restart.
pub struct RecoveryService {
    ctx: Arc<GameContext>,
    club_connect: Arc<ClubConnectService>,
    duel: Arc<DuelService>,
}

impl RecoveryService {
    pub fn new(
        ctx: Arc<GameContext>,
        club_connect: Arc<ClubConnectService>,
        duel: Arc<DuelService>,
    ) -> Self {
        RecoveryService {
            ctx,
            club_connect,
            duel,
        }
    }

    /// Rehydrates every active row. Rows that cannot be resumed are marked
    /// `error` and left out of memory.
    pub async fn recover(&self) -> Result<RecoveryReport, GameServiceError> {
        let sessions = self.ctx.games.list_active().await?;
        info!(count = sessions.len(), "Recovering active games");

        let mut report = RecoveryReport::default();
        for session in sessions {
            match self.restore(session.clone()).await {
                Ok(()) => report.restored += 1,
                Err(e) => {
                    warn!(game_id = %session.id, chat_id = session.chat_id, error = %e, "Could not restore game");
                    self.mark_error(session).await;
                    report.failed += 1;
                }
            }
        }

        info!(restored = report.restored, failed = report.failed, "Recovery finished");
        Ok(report)
    }

    async fn restore(&self, session: GameSession) -> Result<(), GameServiceError> {
        for player_id in [session.player1_id, session.player2_id] {
            self.ctx.transport.get_player(player_id).await?;
        }
        match session.kind {
            GameKind::ClubConnect => self.club_connect.restore(session).await,
            GameKind::Duel => self.duel.restore(session).await,
        }
    }

    async fn mark_error(&self, mut session: GameSession) {
        session.mark_error(now_ts());
        if let Err(e) = self.ctx.games.update_game(&session).await {
            error!(game_id = %session.id, error = %e, "Failed to mark game as errored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::models::club_connect::ClubConnectState;
    use crate::models::duel::{DuelEntity, DuelState};
    use crate::models::game_session::{GameState, GameStatus};
    use crate::models::player::Player;
    use crate::repositories::catalog::{ClubCatalog, DuelPool};
    use crate::repositories::errors::game_repository_errors::GameRecordRepositoryError;
    use crate::repositories::game_repository::{GameRecordRepository, MockGameRecordRepository};
    use crate::repositories::memory_repository::{
        InMemoryGameRecordRepository, InMemoryLeaderboardRepository,
    };
    use crate::services::chat_transport::tests::RecordingTransport;

    fn club_game(chat_id: i64, player2_id: i64) -> GameSession {
        GameSession::new(
            chat_id,
            1,
            player2_id,
            GameState::ClubConnect(ClubConnectState::new(
                vec!["a".into(), "b".into(), "c".into()],
                vec!["d".into(), "e".into(), "f".into()],
            )),
        )
    }

    fn recovery(
        games: Arc<dyn GameRecordRepository + Send + Sync>,
    ) -> (RecoveryService, Arc<GameContext>) {
        let transport = Arc::new(
            RecordingTransport::new().with_players(vec![Player::new(1, "Ann"), Player::new(2, "Bob")]),
        );
        let ctx = Arc::new(GameContext::new(
            games,
            Arc::new(InMemoryLeaderboardRepository::new()),
            transport,
            GameConfig::default(),
        ));
        let club_connect = Arc::new(ClubConnectService::new(ctx.clone(), Arc::new(ClubCatalog::empty())));
        let duel = Arc::new(DuelService::new(ctx.clone(), Arc::new(DuelPool::empty())));
        (RecoveryService::new(ctx.clone(), club_connect, duel), ctx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_games_and_marks_broken_rows() {
        let good = club_game(-1, 2);
        let unknown_player = club_game(-2, 99);
        let duel = GameSession::new(
            -3,
            1,
            2,
            GameState::Duel(DuelState::new(vec![DuelEntity::new("messi", &[])])),
        );
        let mut finished = club_game(-4, 2);
        finished.finish(Some(1), 10);
        let games = Arc::new(InMemoryGameRecordRepository::with_sessions(vec![
            good.clone(),
            unknown_player.clone(),
            duel.clone(),
            finished,
        ]));
        let (service, ctx) = recovery(games.clone());

        let report = service.recover().await.unwrap();

        assert_eq!(report, RecoveryReport { restored: 2, failed: 1 });
        assert!(ctx.registry.is_active(-1, GameKind::ClubConnect).await);
        assert!(ctx.registry.is_active(-3, GameKind::Duel).await);
        assert!(!ctx.registry.is_active(-2, GameKind::ClubConnect).await);
        assert_eq!(
            games.get_game(&unknown_player.id).await.unwrap().status,
            GameStatus::Error
        );
        assert_eq!(games.get_game(&good.id).await.unwrap().status, GameStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_active_row_for_same_chat_is_rejected() {
        let first = club_game(-1, 2);
        let second = club_game(-1, 2);
        let games = Arc::new(InMemoryGameRecordRepository::with_sessions(vec![
            first.clone(),
            second.clone(),
        ]));
        let (service, _) = recovery(games.clone());

        let report = service.recover().await.unwrap();

        assert_eq!(report, RecoveryReport { restored: 1, failed: 1 });
        let statuses = [
            games.get_game(&first.id).await.unwrap().status,
            games.get_game(&second.id).await.unwrap().status,
        ];
        assert!(statuses.contains(&GameStatus::Active));
        assert!(statuses.contains(&GameStatus::Error));
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let mut games = MockGameRecordRepository::new();
        games
            .expect_list_active()
            .returning(|| Err(GameRecordRepositoryError::DynamoDb("throttled".to_string())));
        let (service, _) = recovery(Arc::new(games));

        let result = service.recover().await;

        assert!(matches!(result, Err(GameServiceError::Repository(_))));
    }
}
