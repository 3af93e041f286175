use crate::services::errors::game_service_errors::GameServiceError;
use crate::services::errors::transport_errors::TransportError;

#[derive(Debug)]
pub enum ChallengeServiceError {
    GroupOnly,
    MissingTarget,
    SelfChallenge,
    InvalidTarget,
    SessionActive,
    NotFound,
    NotInvited,
    NotAllowed,
    Game(GameServiceError),
    Transport(TransportError),
}

impl ChallengeServiceError {
    pub fn user_message(&self) -> String {
        match self {
            ChallengeServiceError::GroupOnly => "Games are only available in group chats.".to_string(),
            ChallengeServiceError::MissingTarget => {
                "Reply to your opponent's message with the command to challenge them.".to_string()
            }
            ChallengeServiceError::SelfChallenge => "You cannot challenge yourself.".to_string(),
            ChallengeServiceError::InvalidTarget => "You can only challenge a human player.".to_string(),
            ChallengeServiceError::SessionActive => {
                "A game is already running in this chat.".to_string()
            }
            ChallengeServiceError::NotFound => "This invitation is no longer valid.".to_string(),
            ChallengeServiceError::NotInvited => "This invitation is not for you.".to_string(),
            ChallengeServiceError::NotAllowed => "Only the losing player can ask for a rematch.".to_string(),
            ChallengeServiceError::Game(err) => err.user_message(),
            ChallengeServiceError::Transport(_) => "Something went wrong, please try again.".to_string(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        match self {
            ChallengeServiceError::Game(err) => err.is_rejection(),
            ChallengeServiceError::Transport(_) => false,
            _ => true,
        }
    }
}

impl std::fmt::Display for ChallengeServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeServiceError::Game(err) => write!(f, "Game error: {}", err),
            ChallengeServiceError::Transport(err) => write!(f, "Transport error: {}", err),
            other => write!(f, "Rejected: {}", other.user_message()),
        }
    }
}

impl std::error::Error for ChallengeServiceError {}

impl From<GameServiceError> for ChallengeServiceError {
    fn from(err: GameServiceError) -> Self {
        ChallengeServiceError::Game(err)
    }
}

impl From<TransportError> for ChallengeServiceError {
    fn from(err: TransportError) -> Self {
        ChallengeServiceError::Transport(err)
    }
}
