use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::models::callback::InlineKeyboard;
use crate::models::duel::{round_points, DuelEntity, DuelState};
use crate::models::game_session::{now_ts, GameKind, GameSession, GameState};
use crate::models::player::{ChatId, Player, PlayerId};
use crate::repositories::catalog::DuelPool;
use crate::services::errors::game_service_errors::GameServiceError;
use crate::services::game_context::GameContext;
use crate::services::matcher::{accept_best, MatchMode};
use crate::services::session_registry::SessionSlot;
use crate::services::timer_service::TurnTimerService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundWin {
    pub round: u32,
    pub winner_id: PlayerId,
    pub points: u32,
    pub answer: String,
}

fn round_hint(entity: &DuelEntity) -> String {
    let first = entity
        .canonical_name
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default();
    let letters = entity
        .canonical_name
        .chars()
        .filter(|c| c.is_alphabetic())
        .count();
    format!("starts with {}, {} letters", first, letters)
}

/// Five-round race: the first correct answer takes the round.
pub struct DuelService {
    ctx: Arc<GameContext>,
    pool: Arc<DuelPool>,
    timers: TurnTimerService<ChatId>,
}

impl DuelService {
    pub fn new(ctx: Arc<GameContext>, pool: Arc<DuelPool>) -> Self {
        DuelService {
            ctx,
            pool,
            timers: TurnTimerService::new(),
        }
    }

    fn slot(&self, chat_id: ChatId) -> SessionSlot {
        self.ctx.registry.slot(chat_id, GameKind::Duel)
    }

    pub fn is_available(&self) -> bool {
        self.pool.len() >= self.ctx.config.duel_total_rounds as usize
    }

    pub fn timer_armed(&self, chat_id: ChatId) -> bool {
        self.timers.is_armed(&chat_id)
    }

    pub async fn start(
        self: &Arc<Self>,
        chat_id: ChatId,
        proposer: &Player,
        target: &Player,
    ) -> Result<GameSession, GameServiceError> {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        if guard.as_ref().map_or(false, GameSession::is_active) {
            return Err(GameServiceError::SessionActive);
        }

        let total_rounds = self.ctx.config.duel_total_rounds as usize;
        let sampled = {
            let mut rng = rand::thread_rng();
            self.pool.sample(&mut rng, total_rounds)
        };
        let sequence = sampled.map_err(|e| {
            warn!(chat_id, error = %e, "Duel cannot start");
            GameServiceError::DataUnavailable("the duel answers are not loaded".to_string())
        })?;

        let session = GameSession::new(
            chat_id,
            proposer.id,
            target.id,
            GameState::Duel(DuelState::new(sequence)),
        );
        info!(game_id = %session.id, chat_id, player1 = proposer.id, player2 = target.id, "Duel started");

        self.ctx.persist_new(&session).await;
        *guard = Some(session.clone());
        self.schedule_round(&session, self.ctx.config.duel_start_delay);

        self.ctx
            .say(
                chat_id,
                &format!(
                    "Duel: {} vs {}. {} rounds, first correct answer takes the round. Get ready!",
                    proposer.mention(),
                    target.mention(),
                    total_rounds
                ),
            )
            .await;
        Ok(session)
    }

    fn schedule_round(self: &Arc<Self>, session: &GameSession, delay: Duration) {
        let Some(state) = session.duel() else {
            return;
        };
        let chat_id = session.chat_id;
        let session_id = session.id.clone();
        let round = state.round;
        let this = Arc::clone(self);
        self.timers.start(chat_id, delay, move || async move {
            this.open_round(chat_id, session_id, round).await;
        });
    }

    fn schedule_finalize(self: &Arc<Self>, session: &GameSession, delay: Duration) {
        let chat_id = session.chat_id;
        let session_id = session.id.clone();
        let this = Arc::clone(self);
        self.timers.start(chat_id, delay, move || async move {
            this.finalize(chat_id, session_id).await;
        });
    }

    fn arm_round_timeout(self: &Arc<Self>, session: &GameSession) {
        let Some(state) = session.duel() else {
            return;
        };
        let chat_id = session.chat_id;
        let session_id = session.id.clone();
        let round = state.round;
        let this = Arc::clone(self);
        self.timers.start(
            chat_id,
            self.ctx.config.duel_round_timeout,
            move || async move {
                this.on_round_timeout(chat_id, session_id, round).await;
            },
        );
    }

    /// Next round, or the final tally once every round has resolved.
    fn advance(self: &Arc<Self>, session: &GameSession, delay: Duration) {
        match session.duel() {
            Some(state) if state.rounds_exhausted() => self.schedule_finalize(session, delay),
            Some(_) => self.schedule_round(session, delay),
            None => {}
        }
    }

    pub async fn open_round(self: &Arc<Self>, chat_id: ChatId, session_id: String, round: u32) {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        if self.timers.is_armed(&chat_id) {
            debug!(chat_id, round, "Round opening superseded");
            return;
        }
        let Some(session) = guard.as_mut().filter(|s| s.is_active() && s.id == session_id) else {
            return;
        };
        let Some(state) = session.duel_mut() else {
            return;
        };
        if state.round != round || state.round_open {
            debug!(chat_id, round, current = state.round, "Stale round opening");
            return;
        }
        let Some(entity) = state.current_entity().cloned() else {
            warn!(chat_id, round, "Duel round has no answer");
            return;
        };
        let total = state.total_rounds;
        let last = state.is_last_round();
        state.round_open = true;
        let now = now_ts();
        state.round_start_time = now;
        session.touch(now);
        let snapshot = session.clone();

        info!(chat_id, round, "Duel round opened");
        self.ctx.persist(&snapshot).await;
        self.arm_round_timeout(&snapshot);

        let caption = if last {
            format!("Final round {}/{}: who is this?", round, total)
        } else {
            format!("Round {}/{}: who is this?", round, total)
        };
        if let Some(photo) = &entity.photo_file {
            match self.ctx.transport.send_photo(chat_id, photo, &caption).await {
                Ok(_) => return,
                Err(e) => warn!(chat_id, photo = %photo, error = %e, "Failed to send round photo"),
            }
        }
        self.ctx
            .say(chat_id, &format!("{} Hint: {}.", caption, round_hint(&entity)))
            .await;
    }

    /// Checks a chat message against the open round.
    ///
    /// `sent_at` is the message timestamp in seconds and sets the points.
    /// Returns `Ok(None)` for anything that does not win the round.
    pub async fn submit_guess(
        self: &Arc<Self>,
        chat_id: ChatId,
        player_id: PlayerId,
        text: &str,
        sent_at: i64,
    ) -> Result<Option<RoundWin>, GameServiceError> {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        let Some(session) = guard.as_mut().filter(|s| s.is_active()) else {
            return Ok(None);
        };
        let Some(seat) = session.seat_of(player_id) else {
            return Ok(None);
        };
        let Some(state) = session.duel_mut() else {
            return Ok(None);
        };
        if !state.round_open || text.trim().is_empty() {
            return Ok(None);
        }
        let Some(entity) = state.current_entity().cloned() else {
            return Ok(None);
        };
        if accept_best(
            MatchMode::Ratio,
            text,
            entity.answers(),
            self.ctx.config.duel_match_threshold,
        )
        .is_none()
        {
            return Ok(None);
        }

        let round = state.round;
        let points = round_points(
            self.ctx.config.duel_points_base,
            sent_at - state.round_start_time,
        );
        state.award(seat, points);
        state.round_open = false;
        state.round += 1;
        let scores = state.scores;
        session.touch(now_ts());
        let snapshot = session.clone();

        self.timers.cancel(&chat_id);
        info!(chat_id, round, player_id, points, "Duel round won");
        self.ctx.persist(&snapshot).await;
        self.advance(&snapshot, self.ctx.config.duel_round_pause);

        let name = self.ctx.mention(player_id).await;
        self.ctx
            .say(
                chat_id,
                &format!(
                    "{} got it: {}! +{} points. Score {}:{}.",
                    name, entity.canonical_name, points, scores[0], scores[1]
                ),
            )
            .await;

        Ok(Some(RoundWin {
            round,
            winner_id: player_id,
            points,
            answer: entity.canonical_name,
        }))
    }

    pub async fn on_round_timeout(self: &Arc<Self>, chat_id: ChatId, session_id: String, round: u32) {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        if self.timers.is_armed(&chat_id) {
            debug!(chat_id, round, "Round timeout superseded");
            return;
        }
        let Some(session) = guard.as_mut().filter(|s| s.is_active() && s.id == session_id) else {
            return;
        };
        let Some(state) = session.duel_mut() else {
            return;
        };
        if state.round != round || !state.round_open {
            debug!(chat_id, round, current = state.round, "Stale round timeout");
            return;
        }
        let answer = state
            .current_entity()
            .map(|e| e.canonical_name.clone())
            .unwrap_or_default();
        state.round_open = false;
        state.round += 1;
        session.touch(now_ts());
        let snapshot = session.clone();

        info!(chat_id, round, "Duel round timed out");
        self.ctx.persist(&snapshot).await;
        self.advance(&snapshot, self.ctx.config.duel_round_pause);
        self.ctx
            .say(
                chat_id,
                &format!("Time is up! The answer was {}. No points this round.", answer),
            )
            .await;
    }

    pub async fn finalize(&self, chat_id: ChatId, session_id: String) {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        if self.timers.is_armed(&chat_id) {
            return;
        }
        let Some(session) = guard.as_mut().filter(|s| s.is_active() && s.id == session_id) else {
            return;
        };
        let Some(state) = session.duel().cloned() else {
            return;
        };
        if !state.rounds_exhausted() {
            debug!(chat_id, round = state.round, "Finalize before the last round resolved");
            return;
        }

        let now = now_ts();
        let result = state.leader().map(|seat| {
            (session.player_at(seat), session.player_at(seat.other()))
        });
        session.finish(result.map(|(winner, _)| winner), now);
        let snapshot = session.clone();
        *guard = None;

        info!(chat_id, game_id = %snapshot.id, winner = ?snapshot.winner_id, "Duel finished");
        self.ctx.persist(&snapshot).await;

        let first = self.ctx.mention(snapshot.player1_id).await;
        let second = self.ctx.mention(snapshot.player2_id).await;
        let mut lines = vec![
            "Duel over!".to_string(),
            format!(
                "{}: {} points, {} rounds won",
                first, state.scores[0], state.rounds_won[0]
            ),
            format!(
                "{}: {} points, {} rounds won",
                second, state.scores[1], state.rounds_won[1]
            ),
        ];

        let keyboard = match result {
            Some((winner_id, loser_id)) => {
                self.ctx
                    .record_result(GameKind::Duel, winner_id, loser_id)
                    .await;
                let winner = self.ctx.mention(winner_id).await;
                lines.push(format!("{} wins!", winner));
                match self.ctx.leaderboard.stats(GameKind::Duel, winner_id).await {
                    Ok(Some(entry)) if entry.win_streak >= 2 => {
                        lines.push(format!("{} is on a {}-win streak!", winner, entry.win_streak))
                    }
                    Ok(_) => {}
                    Err(e) => warn!(chat_id, winner_id, error = %e, "Failed to read streak"),
                }
                Some(InlineKeyboard::rematch(winner_id, loser_id))
            }
            None => {
                self.ctx
                    .record_draw(GameKind::Duel, snapshot.player1_id, snapshot.player2_id)
                    .await;
                lines.push("It's a draw!".to_string());
                None
            }
        };
        self.ctx.say_with(chat_id, &lines.join("\n"), keyboard).await;
    }

    /// Either participant may stop the duel; nothing is recorded.
    pub async fn cancel(&self, chat_id: ChatId, player_id: PlayerId) -> Result<(), GameServiceError> {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        let session = guard
            .as_mut()
            .filter(|s| s.is_active())
            .ok_or(GameServiceError::NoActiveGame)?;
        if !session.is_participant(player_id) {
            return Err(GameServiceError::NotParticipant);
        }
        session.cancel(now_ts());
        let snapshot = session.clone();
        self.timers.cancel(&chat_id);
        *guard = None;

        info!(chat_id, game_id = %snapshot.id, player_id, "Duel cancelled");
        self.ctx.persist(&snapshot).await;
        let name = self.ctx.mention(player_id).await;
        self.ctx
            .say(chat_id, &format!("{} cancelled the duel.", name))
            .await;
        Ok(())
    }

    /// Resumes a reloaded duel by replaying its current round from the start.
    pub async fn restore(self: &Arc<Self>, mut session: GameSession) -> Result<(), GameServiceError> {
        let Some(state) = session.duel_mut() else {
            return Err(GameServiceError::DataUnavailable(
                "stored game has no duel state".to_string(),
            ));
        };
        if state.total_rounds == 0 || (state.sequence.len() as u32) < state.total_rounds {
            return Err(GameServiceError::DataUnavailable(
                "stored duel lost its answers".to_string(),
            ));
        }
        state.round_open = false;
        let exhausted = state.rounds_exhausted();
        let round = state.round;

        let slot = self.slot(session.chat_id);
        let mut guard = slot.lock().await;
        if guard.as_ref().map_or(false, GameSession::is_active) {
            return Err(GameServiceError::SessionActive);
        }
        *guard = Some(session.clone());
        let delay = self.ctx.config.duel_start_delay;
        if exhausted {
            self.schedule_finalize(&session, delay);
        } else {
            self.schedule_round(&session, delay);
        }

        info!(game_id = %session.id, chat_id = session.chat_id, round, "Duel restored");
        let text = if exhausted {
            "The duel was restored after a restart. Final results coming up.".to_string()
        } else {
            format!(
                "The duel was restored after a restart. Round {} starts again shortly.",
                round
            )
        };
        self.ctx.say(session.chat_id, &text).await;
        Ok(())
    }
}
