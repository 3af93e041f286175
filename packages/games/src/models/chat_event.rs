use crate::models::player::{ChatId, MessageId, Player};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    StartClubConnect,
    StartDuel,
    Cancel,
    Draw,
    Surrender,
    CancelDuel,
    Clubs,
    ClubConnectStats,
    DuelStats,
    ClubConnectHistory,
    ClubConnectLeaderboard,
    DuelLeaderboard,
    Help,
    Unknown(String),
}

impl ChatCommand {
    /// Parses `/name`, `/name@botname` or `name`; arguments after the first word are ignored.
    pub fn parse(input: &str) -> Self {
        let word = input.split_whitespace().next().unwrap_or("");
        let word = word.strip_prefix('/').unwrap_or(word);
        let name = word.split('@').next().unwrap_or("").to_lowercase();
        match name.as_str() {
            "ttt" => ChatCommand::StartClubConnect,
            "duel" => ChatCommand::StartDuel,
            "cancel" => ChatCommand::Cancel,
            "draw" | "peace" => ChatCommand::Draw,
            "surrender" | "giveup" => ChatCommand::Surrender,
            "cancel_duel" => ChatCommand::CancelDuel,
            "clubs" => ChatCommand::Clubs,
            "ttt_mystats" => ChatCommand::ClubConnectStats,
            "duel_mystats" => ChatCommand::DuelStats,
            "ttt_history" => ChatCommand::ClubConnectHistory,
            "ttt_leaderboard" => ChatCommand::ClubConnectLeaderboard,
            "duel_leaderboard" => ChatCommand::DuelLeaderboard,
            "ttt_help" => ChatCommand::Help,
            _ => ChatCommand::Unknown(name),
        }
    }
}

/// Transport-neutral input delivered to the game hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Command {
        chat_id: ChatId,
        is_group: bool,
        sender: Player,
        command: ChatCommand,
        /// Author of the message the command replied to, if any.
        reply_to: Option<Player>,
    },
    Callback {
        chat_id: ChatId,
        message_id: MessageId,
        sender: Player,
        data: String,
    },
    Text {
        chat_id: ChatId,
        sender: Player,
        text: String,
        sent_at: i64,
    },
}

impl ChatEvent {
    pub fn chat_id(&self) -> ChatId {
        match self {
            ChatEvent::Command { chat_id, .. }
            | ChatEvent::Callback { chat_id, .. }
            | ChatEvent::Text { chat_id, .. } => *chat_id,
        }
    }

    pub fn sender(&self) -> &Player {
        match self {
            ChatEvent::Command { sender, .. }
            | ChatEvent::Callback { sender, .. }
            | ChatEvent::Text { sender, .. } => sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(ChatCommand::parse("/ttt"), ChatCommand::StartClubConnect);
        assert_eq!(ChatCommand::parse("/duel@footy_bot"), ChatCommand::StartDuel);
        assert_eq!(ChatCommand::parse("/peace"), ChatCommand::Draw);
        assert_eq!(ChatCommand::parse("/giveup now"), ChatCommand::Surrender);
        assert_eq!(ChatCommand::parse("CANCEL_DUEL"), ChatCommand::CancelDuel);
        assert_eq!(ChatCommand::parse("/ttt_help"), ChatCommand::Help);
        assert_eq!(ChatCommand::parse("/poker"), ChatCommand::Unknown("poker".to_string()));
        assert_eq!(ChatCommand::parse(""), ChatCommand::Unknown(String::new()));
    }

    #[test]
    fn test_event_accessors() {
        let event = ChatEvent::Text {
            chat_id: -9,
            sender: Player::new(3, "Cid"),
            text: "месси".to_string(),
            sent_at: 0,
        };

        assert_eq!(event.chat_id(), -9);
        assert_eq!(event.sender().id, 3);
    }
}
