use crate::repositories::errors::game_repository_errors::GameRecordRepositoryError;
use crate::repositories::errors::leaderboard_repository_errors::LeaderboardRepositoryError;
use crate::services::errors::transport_errors::TransportError;

#[derive(Debug)]
pub enum GameServiceError {
    NoActiveGame,
    NotParticipant,
    NotYourTurn,
    InvalidCell,
    CellOccupied,
    CellAlreadySelected,
    StaleBoard,
    EmptyGuess,
    SessionActive,
    DataUnavailable(String),
    Repository(GameRecordRepositoryError),
    Leaderboard(LeaderboardRepositoryError),
    Transport(TransportError),
}

impl GameServiceError {
    /// Text shown to the player whose action failed.
    pub fn user_message(&self) -> String {
        match self {
            GameServiceError::NoActiveGame => "There is no active game in this chat.".to_string(),
            GameServiceError::NotParticipant => "You are not playing in this game.".to_string(),
            GameServiceError::NotYourTurn => "It is not your turn.".to_string(),
            GameServiceError::InvalidCell => "That cell does not exist.".to_string(),
            GameServiceError::CellOccupied => "That cell is already taken.".to_string(),
            GameServiceError::CellAlreadySelected => {
                "You already picked a cell, name a player now.".to_string()
            }
            GameServiceError::StaleBoard => "That board is no longer in play.".to_string(),
            GameServiceError::EmptyGuess => {
                "Send a player surname, empty answers do not count.".to_string()
            }
            GameServiceError::SessionActive => {
                "A game is already running in this chat.".to_string()
            }
            GameServiceError::DataUnavailable(what) => {
                format!("The game is unavailable right now: {}.", what)
            }
            GameServiceError::Repository(_)
            | GameServiceError::Leaderboard(_)
            | GameServiceError::Transport(_) => {
                "Something went wrong, please try again.".to_string()
            }
        }
    }

    /// Input rejections go back to the actor; everything else is also logged.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            GameServiceError::Repository(_)
                | GameServiceError::Leaderboard(_)
                | GameServiceError::Transport(_)
        )
    }
}

impl std::fmt::Display for GameServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameServiceError::Repository(err) => write!(f, "Repository error: {}", err),
            GameServiceError::Leaderboard(err) => write!(f, "Leaderboard error: {}", err),
            GameServiceError::Transport(err) => write!(f, "Transport error: {}", err),
            other => write!(f, "Rejected: {}", other.user_message()),
        }
    }
}

impl std::error::Error for GameServiceError {}

impl From<GameRecordRepositoryError> for GameServiceError {
    fn from(err: GameRecordRepositoryError) -> Self {
        GameServiceError::Repository(err)
    }
}

impl From<LeaderboardRepositoryError> for GameServiceError {
    fn from(err: LeaderboardRepositoryError) -> Self {
        GameServiceError::Leaderboard(err)
    }
}

impl From<TransportError> for GameServiceError {
    fn from(err: TransportError) -> Self {
        GameServiceError::Transport(err)
    }
}
