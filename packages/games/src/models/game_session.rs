use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::club_connect::ClubConnectState;
use crate::models::duel::DuelState;
use crate::models::player::{ChatId, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    ClubConnect,
    Duel,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::ClubConnect => "club_connect",
            GameKind::Duel => "duel",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GameKind::ClubConnect => "Club Connect",
            GameKind::Duel => "Duel",
        }
    }

    /// Only duel leaderboard rows carry a win streak.
    pub fn tracks_streak(&self) -> bool {
        matches!(self, GameKind::Duel)
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "club_connect" => Ok(GameKind::ClubConnect),
            "duel" => Ok(GameKind::Duel),
            other => Err(format!("Unknown game kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Active,
    Finished,
    Canceled,
    Error,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
            GameStatus::Canceled => "canceled",
            GameStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::Active)
    }
}

/// Fixed role of a player inside a session. `First` is the proposer and moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Seat::First => 'X',
            Seat::Second => 'O',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameState {
    ClubConnect(ClubConnectState),
    Duel(DuelState),
}

impl GameState {
    pub fn kind(&self) -> GameKind {
        match self {
            GameState::ClubConnect(_) => GameKind::ClubConnect,
            GameState::Duel(_) => GameKind::Duel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub chat_id: ChatId,
    pub kind: GameKind,
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    pub status: GameStatus,
    pub winner_id: Option<PlayerId>,
    pub created_at: i64,
    pub last_action_time: i64,
    pub ended_at: Option<i64>,
    pub state: GameState,
    // Pending mutual-consent requests are never persisted; a restart drops them.
    #[serde(skip)]
    pub cancel_requester_id: Option<PlayerId>,
    #[serde(skip)]
    pub draw_requester_id: Option<PlayerId>,
}

pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

impl GameSession {
    pub fn new(chat_id: ChatId, player1_id: PlayerId, player2_id: PlayerId, state: GameState) -> Self {
        let now = now_ts();
        GameSession {
            id: Uuid::new_v4().to_string(),
            chat_id,
            kind: state.kind(),
            player1_id,
            player2_id,
            status: GameStatus::Active,
            winner_id: None,
            created_at: now,
            last_action_time: now,
            ended_at: None,
            state,
            cancel_requester_id: None,
            draw_requester_id: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    pub fn is_participant(&self, player_id: PlayerId) -> bool {
        self.seat_of(player_id).is_some()
    }

    pub fn seat_of(&self, player_id: PlayerId) -> Option<Seat> {
        if player_id == self.player1_id {
            Some(Seat::First)
        } else if player_id == self.player2_id {
            Some(Seat::Second)
        } else {
            None
        }
    }

    pub fn player_at(&self, seat: Seat) -> PlayerId {
        match seat {
            Seat::First => self.player1_id,
            Seat::Second => self.player2_id,
        }
    }

    pub fn opponent_of(&self, player_id: PlayerId) -> Option<PlayerId> {
        self.seat_of(player_id)
            .map(|seat| self.player_at(seat.other()))
    }

    pub fn touch(&mut self, now: i64) {
        self.last_action_time = now;
    }

    // Terminal transitions are no-ops once the session has left `Active`.

    pub fn finish(&mut self, winner_id: Option<PlayerId>, now: i64) {
        if self.is_active() {
            self.status = GameStatus::Finished;
            self.winner_id = winner_id;
            self.ended_at = Some(now);
        }
    }

    pub fn cancel(&mut self, now: i64) {
        if self.is_active() {
            self.status = GameStatus::Canceled;
            self.ended_at = Some(now);
        }
    }

    pub fn mark_error(&mut self, now: i64) {
        if self.is_active() {
            self.status = GameStatus::Error;
            self.ended_at = Some(now);
        }
    }

    /// The row as it is written to storage, with in-memory-only fields cleared.
    pub fn persisted(&self) -> GameSession {
        let mut row = self.clone();
        row.cancel_requester_id = None;
        row.draw_requester_id = None;
        if let GameState::ClubConnect(state) = &mut row.state {
            state.selected_cell = None;
            state.board_message_id = None;
        }
        row
    }

    pub fn club_connect(&self) -> Option<&ClubConnectState> {
        match &self.state {
            GameState::ClubConnect(state) => Some(state),
            _ => None,
        }
    }

    pub fn club_connect_mut(&mut self) -> Option<&mut ClubConnectState> {
        match &mut self.state {
            GameState::ClubConnect(state) => Some(state),
            _ => None,
        }
    }

    pub fn duel(&self) -> Option<&DuelState> {
        match &self.state {
            GameState::Duel(state) => Some(state),
            _ => None,
        }
    }

    pub fn duel_mut(&mut self) -> Option<&mut DuelState> {
        match &mut self.state {
            GameState::Duel(state) => Some(state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::club_connect::CellRef;
    use crate::models::duel::{DuelEntity, DuelState};

    fn club_connect_session() -> GameSession {
        let state = ClubConnectState::new(
            vec!["реал мадрид".into(), "челси".into(), "псж".into()],
            vec!["барселона".into(), "ювентус".into(), "ливерпуль".into()],
        );
        GameSession::new(-100, 1, 2, GameState::ClubConnect(state))
    }

    #[test]
    fn test_game_session_creation() {
        let session = club_connect_session();

        assert_eq!(session.chat_id, -100);
        assert_eq!(session.player1_id, 1);
        assert_eq!(session.player2_id, 2);
        assert_eq!(session.kind, GameKind::ClubConnect);
        assert_eq!(session.status, GameStatus::Active);
        assert!(session.winner_id.is_none());
        assert!(!session.id.is_empty());
    }

    #[test]
    fn test_game_session_id_uniqueness() {
        let session1 = club_connect_session();
        let session2 = club_connect_session();

        assert_ne!(session1.id, session2.id);
    }

    #[test]
    fn test_kind_follows_state() {
        let duel = DuelState::new(vec![DuelEntity::new("kane", &["кейн"])]);
        let session = GameSession::new(-1, 1, 2, GameState::Duel(duel));

        assert_eq!(session.kind, GameKind::Duel);
        assert!(session.duel().is_some());
        assert!(session.club_connect().is_none());
    }

    #[test]
    fn test_seats_and_opponents() {
        let session = club_connect_session();

        assert_eq!(session.seat_of(1), Some(Seat::First));
        assert_eq!(session.seat_of(2), Some(Seat::Second));
        assert_eq!(session.seat_of(3), None);
        assert_eq!(session.opponent_of(1), Some(2));
        assert_eq!(session.opponent_of(3), None);
        assert_eq!(session.player_at(Seat::First.other()), 2);
    }

    #[test]
    fn test_terminal_session_is_not_mutated_again() {
        let mut session = club_connect_session();

        session.finish(Some(1), 100);
        session.cancel(200);
        session.mark_error(300);

        assert_eq!(session.status, GameStatus::Finished);
        assert_eq!(session.winner_id, Some(1));
        assert_eq!(session.ended_at, Some(100));
    }

    #[test]
    fn test_serialization_drops_ephemeral_fields() {
        let mut session = club_connect_session();
        session.cancel_requester_id = Some(1);
        session.draw_requester_id = Some(2);
        session.club_connect_mut().unwrap().selected_cell = CellRef::new(1, 1);

        let serialized = serde_json::to_string(&session).unwrap();
        assert!(serialized.contains("\"club_connect\""));
        assert!(!serialized.contains("cancel_requester_id"));

        let deserialized: GameSession = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.id, session.id);
        assert_eq!(deserialized.cancel_requester_id, None);
        assert_eq!(deserialized.draw_requester_id, None);
        assert_eq!(deserialized.club_connect().unwrap().selected_cell, None);
        assert_eq!(deserialized, session.persisted());
    }

    #[test]
    fn test_status_and_kind_string_forms() {
        assert_eq!(GameStatus::Active.as_str(), "active");
        assert!(GameStatus::Canceled.is_terminal());
        assert!(!GameStatus::Active.is_terminal());
        assert_eq!("duel".parse::<GameKind>().unwrap(), GameKind::Duel);
        assert!("poker".parse::<GameKind>().is_err());
        assert_eq!(serde_json::to_string(&GameStatus::Error).unwrap(), "\"error\"");
    }
}
