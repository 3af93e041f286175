use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::callback::{CallbackData, InlineButton, InlineKeyboard};
use crate::models::club_connect::{BoardOutcome, CellRef, ClubConnectState, GRID_SIZE};
use crate::models::game_session::{now_ts, GameKind, GameSession, GameState, Seat};
use crate::models::player::{ChatId, MessageId, Player, PlayerId};
use crate::repositories::catalog::ClubCatalog;
use crate::services::errors::game_service_errors::GameServiceError;
use crate::services::game_context::GameContext;
use crate::services::matcher::{best_match, MatchMode};
use crate::services::session_registry::SessionSlot;
use crate::services::timer_service::TurnTimerService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessVerdict {
    Claimed { surname: String, score: u8 },
    Missed { best_score: u8 },
    NoCommonPlayers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessResolution {
    pub verdict: GuessVerdict,
    pub outcome: BoardOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    /// First request recorded; waiting for the opponent.
    Requested,
    /// The same player asked again; nothing changed.
    AlreadyPending,
    /// Both players agreed and the game is over.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Consent {
    Cancel,
    Draw,
}

fn active_mut(guard: &mut Option<GameSession>) -> Result<&mut GameSession, GameServiceError> {
    guard
        .as_mut()
        .filter(|session| session.is_active())
        .ok_or(GameServiceError::NoActiveGame)
}

/// Remembers the latest board message so presses on older boards are refused.
/// A failed send keeps the previous board live.
fn track_board(guard: &mut Option<GameSession>, board: Option<MessageId>) {
    let Some(message_id) = board else {
        return;
    };
    if let Some(state) = guard.as_mut().and_then(GameSession::club_connect_mut) {
        state.board_message_id = Some(message_id);
    }
}

pub fn render_board(state: &ClubConnectState) -> String {
    let mut lines = vec![format!("Columns: {}", state.clubs_cols.join(" | "))];
    for (row, club) in state.clubs_rows.iter().enumerate() {
        let cells: Vec<String> = (0..GRID_SIZE)
            .filter_map(|col| CellRef::new(row, col))
            .map(|cell| {
                state
                    .board
                    .get(cell)
                    .map(|seat| seat.symbol().to_string())
                    .unwrap_or_else(|| "·".to_string())
            })
            .collect();
        lines.push(format!("{}: {}", club, cells.join(" ")));
    }
    lines.join("\n")
}

/// One button per cell. Taken cells carry the no-op payload.
pub fn board_keyboard(state: &ClubConnectState) -> InlineKeyboard {
    let rows = (0..GRID_SIZE)
        .map(|row| {
            (0..GRID_SIZE)
                .filter_map(|col| CellRef::new(row, col))
                .map(|cell| match state.board.get(cell) {
                    Some(seat) => InlineButton::new(seat.symbol().to_string(), CallbackData::Ignore),
                    None => InlineButton::new("·", CallbackData::Cell(cell)),
                })
                .collect()
        })
        .collect();
    InlineKeyboard::new(rows)
}

/// The 3x3 club grid game. One session per chat.
pub struct ClubConnectService {
    ctx: Arc<GameContext>,
    catalog: Arc<ClubCatalog>,
    timers: TurnTimerService<ChatId>,
}

impl ClubConnectService {
    pub fn new(ctx: Arc<GameContext>, catalog: Arc<ClubCatalog>) -> Self {
        ClubConnectService {
            ctx,
            catalog,
            timers: TurnTimerService::new(),
        }
    }

    fn slot(&self, chat_id: ChatId) -> SessionSlot {
        self.ctx.registry.slot(chat_id, GameKind::ClubConnect)
    }

    pub fn is_available(&self) -> bool {
        self.catalog.is_available()
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

        let grid = {
            let mut rng = rand::thread_rng();
            self.catalog.pick_grid(&mut rng)
        };
        let (rows, cols) = grid.map_err(|e| {
            warn!(chat_id, error = %e, "Club Connect cannot start");
            GameServiceError::DataUnavailable("the club list is not loaded".to_string())
        })?;

        let session = GameSession::new(
            chat_id,
            proposer.id,
            target.id,
            GameState::ClubConnect(ClubConnectState::new(rows, cols)),
        );
        info!(game_id = %session.id, chat_id, player1 = proposer.id, player2 = target.id, "Club Connect started");

        self.ctx.persist_new(&session).await;
        *guard = Some(session.clone());

        if let Some(state) = session.club_connect() {
            let text = format!(
                "Club Connect: {} (X) vs {} (O)\n{}\nTurn: {} (X). Pick a cell.",
                proposer.mention(),
                target.mention(),
                render_board(state),
                proposer.mention()
            );
            let board = self
                .ctx
                .say_with(chat_id, &text, Some(board_keyboard(state)))
                .await;
            track_board(&mut guard, board);
        }
        self.arm_turn_timer(&session);
        Ok(session)
    }

    fn arm_turn_timer(self: &Arc<Self>, session: &GameSession) {
        let Some(state) = session.club_connect() else {
            return;
        };
        let chat_id = session.chat_id;
        let session_id = session.id.clone();
        let turn = state.turn;
        let owner = session.player_at(turn);
        let this = Arc::clone(self);
        self.timers.start(
            chat_id,
            self.ctx.config.club_connect_turn_timeout,
            move || async move {
                this.on_turn_timeout(chat_id, session_id, turn, owner).await;
            },
        );
    }

    /// Picks the cell the current player will name a player for.
    ///
    /// `message_id` is the board the button was pressed on. One cell per turn:
    /// the choice stands until the guess resolves or the turn times out.
    pub async fn select_cell(
        self: &Arc<Self>,
        chat_id: ChatId,
        message_id: MessageId,
        player_id: PlayerId,
        cell: CellRef,
    ) -> Result<(), GameServiceError> {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        let session = active_mut(&mut guard)?;
        let seat = session
            .seat_of(player_id)
            .ok_or(GameServiceError::NotParticipant)?;
        let state = session
            .club_connect_mut()
            .ok_or(GameServiceError::NoActiveGame)?;
        if !state.is_live_board(message_id) {
            return Err(GameServiceError::StaleBoard);
        }
        if state.turn != seat {
            return Err(GameServiceError::NotYourTurn);
        }
        if state.selected_cell.is_some() {
            return Err(GameServiceError::CellAlreadySelected);
        }
        if !state.board.is_empty_at(cell) {
            return Err(GameServiceError::CellOccupied);
        }
        let (row_club, col_club) = state
            .clubs_for(cell)
            .map(|(r, c)| (r.to_string(), c.to_string()))
            .ok_or(GameServiceError::InvalidCell)?;
        state.selected_cell = Some(cell);
        session.touch(now_ts());
        let snapshot = session.clone();

        debug!(chat_id, player_id, row = cell.row, col = cell.col, "Cell selected");
        self.ctx.persist(&snapshot).await;
        self.arm_turn_timer(&snapshot);

        let name = self.ctx.mention(player_id).await;
        self.ctx
            .say(
                chat_id,
                &format!(
                    "{}, name a player who played for both {} and {}.",
                    name, row_club, col_club
                ),
            )
            .await;
        Ok(())
    }

    /// Resolves a free-text guess from the player whose turn it is.
    ///
    /// Returns `Ok(None)` when the text is not a guess for this game, so the
    /// caller can offer it elsewhere.
    pub async fn submit_guess(
        self: &Arc<Self>,
        chat_id: ChatId,
        player_id: PlayerId,
        text: &str,
    ) -> Result<Option<GuessResolution>, GameServiceError> {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        let Some(session) = guard.as_mut().filter(|s| s.is_active()) else {
            return Ok(None);
        };
        let Some(seat) = session.seat_of(player_id) else {
            return Ok(None);
        };
        let player_at_seat = session.player_at(seat);
        let opponent_id = session.player_at(seat.other());
        let Some(state) = session.club_connect_mut() else {
            return Ok(None);
        };
        let Some(cell) = state.selected_cell.filter(|_| state.turn == seat) else {
            return Ok(None);
        };

        if text.trim().is_empty() {
            return Err(GameServiceError::EmptyGuess);
        }

        let (row_club, col_club) = state
            .clubs_for(cell)
            .map(|(r, c)| (r.to_string(), c.to_string()))
            .ok_or(GameServiceError::InvalidCell)?;
        let answers = self.catalog.intersection(&row_club, &col_club);

        let verdict = if answers.is_empty() {
            GuessVerdict::NoCommonPlayers
        } else {
            let best = best_match(
                MatchMode::TokenSet,
                text,
                answers.iter().map(String::as_str),
            );
            match best {
                Some(found) if found.score >= self.ctx.config.club_match_threshold => {
                    state.board.claim(cell, seat);
                    GuessVerdict::Claimed {
                        surname: found.candidate,
                        score: found.score,
                    }
                }
                other => GuessVerdict::Missed {
                    best_score: other.map_or(0, |m| m.score),
                },
            }
        };

        let outcome = state.board.outcome();
        if outcome == BoardOutcome::InProgress {
            state.pass_turn();
        } else {
            state.selected_cell = None;
        }
        let now = now_ts();
        session.touch(now);
        match outcome {
            BoardOutcome::Won(winner_seat) => {
                let winner = session.player_at(winner_seat);
                session.finish(Some(winner), now);
            }
            BoardOutcome::Draw => session.finish(None, now),
            BoardOutcome::InProgress => {}
        }
        let snapshot = session.clone();

        info!(chat_id, player_id, verdict = ?verdict, outcome = ?outcome, "Club Connect guess resolved");
        if outcome != BoardOutcome::InProgress {
            self.timers.cancel(&chat_id);
            *guard = None;
        }
        self.ctx.persist(&snapshot).await;

        let name = self.ctx.mention(player_at_seat).await;
        let verdict_text = match &verdict {
            GuessVerdict::Claimed { surname, score } => {
                format!("{} claims the cell with {} ({}%).", name, surname, score)
            }
            GuessVerdict::Missed { best_score } => format!(
                "{} is not accepted (best match {}%). The turn passes.",
                text.trim(),
                best_score
            ),
            GuessVerdict::NoCommonPlayers => format!(
                "No player has played for both {} and {}. The turn passes.",
                row_club, col_club
            ),
        };

        match outcome {
            BoardOutcome::Won(_) => {
                self.ctx
                    .record_result(GameKind::ClubConnect, player_at_seat, opponent_id)
                    .await;
                self.announce_board(&snapshot, &format!("{}\n{} wins!", verdict_text, name), false)
                    .await;
            }
            BoardOutcome::Draw => {
                self.ctx
                    .record_draw(GameKind::ClubConnect, player_at_seat, opponent_id)
                    .await;
                self.announce_board(&snapshot, &format!("{}\nThe board is full. It's a draw!", verdict_text), false)
                    .await;
            }
            BoardOutcome::InProgress => {
                self.arm_turn_timer(&snapshot);
                let next = self.ctx.mention(opponent_id).await;
                let board = self
                    .announce_board(&snapshot, &format!("{}\nTurn: {}.", verdict_text, next), true)
                    .await;
                track_board(&mut guard, board);
            }
        }

        Ok(Some(GuessResolution { verdict, outcome }))
    }

    async fn announce_board(
        &self,
        session: &GameSession,
        headline: &str,
        with_keyboard: bool,
    ) -> Option<MessageId> {
        let state = session.club_connect()?;
        let text = format!("{}\n{}", headline, render_board(state));
        let keyboard = with_keyboard.then(|| board_keyboard(state));
        self.ctx.say_with(session.chat_id, &text, keyboard).await
    }

    /// Turn timeout: passes the turn if nothing happened since the timer was armed.
    pub async fn on_turn_timeout(
        self: &Arc<Self>,
        chat_id: ChatId,
        session_id: String,
        expected_turn: Seat,
        expected_owner: PlayerId,
    ) {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        if self.timers.is_armed(&chat_id) {
            debug!(chat_id, "Turn timeout superseded by a newer timer");
            return;
        }
        let Some(session) = guard.as_mut().filter(|s| s.is_active() && s.id == session_id) else {
            debug!(chat_id, %session_id, "Turn timeout for a finished game");
            return;
        };
        if session.player_at(expected_turn) != expected_owner {
            return;
        }
        let Some(state) = session.club_connect_mut() else {
            return;
        };
        if state.turn != expected_turn {
            debug!(chat_id, "Turn timeout after the turn already moved on");
            return;
        }

        state.pass_turn();
        let next_owner = session.player_at(expected_turn.other());
        session.touch(now_ts());
        let snapshot = session.clone();

        info!(chat_id, timed_out = expected_owner, "Club Connect turn timed out");
        self.ctx.persist(&snapshot).await;
        self.arm_turn_timer(&snapshot);

        let late = self.ctx.mention(expected_owner).await;
        let next = self.ctx.mention(next_owner).await;
        let board = self
            .announce_board(
                &snapshot,
                &format!("{} ran out of time. Turn: {}.", late, next),
                true,
            )
            .await;
        track_board(&mut guard, board);
    }

    pub async fn request_cancel(
        &self,
        chat_id: ChatId,
        player_id: PlayerId,
    ) -> Result<ConsentOutcome, GameServiceError> {
        self.request_consent(chat_id, player_id, Consent::Cancel)
            .await
    }

    pub async fn request_draw(
        &self,
        chat_id: ChatId,
        player_id: PlayerId,
    ) -> Result<ConsentOutcome, GameServiceError> {
        self.request_consent(chat_id, player_id, Consent::Draw).await
    }

    async fn request_consent(
        &self,
        chat_id: ChatId,
        player_id: PlayerId,
        consent: Consent,
    ) -> Result<ConsentOutcome, GameServiceError> {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        let session = active_mut(&mut guard)?;
        let opponent_id = session
            .opponent_of(player_id)
            .ok_or(GameServiceError::NotParticipant)?;
        let pending = match consent {
            Consent::Cancel => &mut session.cancel_requester_id,
            Consent::Draw => &mut session.draw_requester_id,
        };

        match *pending {
            Some(requester) if requester == player_id => {
                debug!(chat_id, player_id, ?consent, "Consent request already pending");
                Ok(ConsentOutcome::AlreadyPending)
            }
            Some(_) => {
                let now = now_ts();
                match consent {
                    Consent::Cancel => session.cancel(now),
                    Consent::Draw => session.finish(None, now),
                }
                let snapshot = session.clone();
                self.timers.cancel(&chat_id);
                *guard = None;

                info!(chat_id, game_id = %snapshot.id, ?consent, "Club Connect ended by agreement");
                self.ctx.persist(&snapshot).await;
                let text = match consent {
                    Consent::Cancel => "Both players agreed. The game is cancelled.".to_string(),
                    Consent::Draw => {
                        self.ctx
                            .record_draw(GameKind::ClubConnect, player_id, opponent_id)
                            .await;
                        "Both players agreed. The game ends in a draw.".to_string()
                    }
                };
                self.ctx.say(chat_id, &text).await;
                Ok(ConsentOutcome::Completed)
            }
            None => {
                *pending = Some(player_id);
                let name = self.ctx.mention(player_id).await;
                let opponent = self.ctx.mention(opponent_id).await;
                let text = match consent {
                    Consent::Cancel => format!(
                        "{} wants to cancel the game. {}, send /cancel to agree.",
                        name, opponent
                    ),
                    Consent::Draw => format!(
                        "{} offers a draw. {}, send /draw to accept.",
                        name, opponent
                    ),
                };
                self.ctx.say(chat_id, &text).await;
                Ok(ConsentOutcome::Requested)
            }
        }
    }

    pub async fn surrender(
        &self,
        chat_id: ChatId,
        player_id: PlayerId,
    ) -> Result<PlayerId, GameServiceError> {
        let slot = self.slot(chat_id);
        let mut guard = slot.lock().await;
        let session = active_mut(&mut guard)?;
        let winner_id = session
            .opponent_of(player_id)
            .ok_or(GameServiceError::NotParticipant)?;
        session.finish(Some(winner_id), now_ts());
        let snapshot = session.clone();
        self.timers.cancel(&chat_id);
        *guard = None;

        info!(chat_id, loser = player_id, winner = winner_id, "Club Connect surrendered");
        self.ctx.persist(&snapshot).await;
        self.ctx
            .record_result(GameKind::ClubConnect, winner_id, player_id)
            .await;

        let loser = self.ctx.mention(player_id).await;
        let winner = self.ctx.mention(winner_id).await;
        self.ctx
            .say(chat_id, &format!("{} surrendered. {} wins!", loser, winner))
            .await;
        Ok(winner_id)
    }

    /// Row and column clubs of the running game.
    pub async fn clubs(&self, chat_id: ChatId) -> Result<(Vec<String>, Vec<String>), GameServiceError> {
        let session = self
            .ctx
            .registry
            .snapshot(chat_id, GameKind::ClubConnect)
            .await
            .filter(GameSession::is_active)
            .ok_or(GameServiceError::NoActiveGame)?;
        let state = session
            .club_connect()
            .ok_or(GameServiceError::NoActiveGame)?;
        Ok((state.clubs_rows.clone(), state.clubs_cols.clone()))
    }

    /// Puts a reloaded session back in memory and re-arms its turn timer.
    pub async fn restore(self: &Arc<Self>, session: GameSession) -> Result<(), GameServiceError> {
        let Some(state) = session.club_connect() else {
            return Err(GameServiceError::DataUnavailable(
                "stored game has no board".to_string(),
            ));
        };
        for club in state.clubs_rows.iter().chain(state.clubs_cols.iter()) {
            if self.catalog.members(club).is_none() {
                warn!(chat_id = session.chat_id, club = %club, "Restored game uses a club missing from the catalog");
            }
        }

        let slot = self.slot(session.chat_id);
        let mut guard = slot.lock().await;
        if guard.as_ref().map_or(false, GameSession::is_active) {
            return Err(GameServiceError::SessionActive);
        }
        *guard = Some(session.clone());
        self.arm_turn_timer(&session);

        info!(game_id = %session.id, chat_id = session.chat_id, "Club Connect restored");
        let owner = self.ctx.mention(session.player_at(state.turn)).await;
        let board = self
            .announce_board(
                &session,
                &format!("The game was restored after a restart. Turn: {}. Pick a cell.", owner),
                true,
            )
            .await;
        track_board(&mut guard, board);
        Ok(())
    }
}
