use crate::models::game_session::{now_ts, GameKind};
use crate::models::player::{ChatId, MessageId, Player};

/// An invite waiting for the target's answer. Keyed by the invite message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub chat_id: ChatId,
    pub kind: GameKind,
    pub proposer: Player,
    pub target: Player,
    pub invite_message_id: MessageId,
    pub created_at: i64,
    pub is_rematch: bool,
}

impl Challenge {
    pub fn new(
        chat_id: ChatId,
        kind: GameKind,
        proposer: Player,
        target: Player,
        invite_message_id: MessageId,
        is_rematch: bool,
    ) -> Self {
        Challenge {
            chat_id,
            kind,
            proposer,
            target,
            invite_message_id,
            created_at: now_ts(),
            is_rematch,
        }
    }

    pub fn involves(&self, player_id: i64) -> bool {
        self.proposer.id == player_id || self.target.id == player_id
    }

    pub fn expired_text(&self) -> String {
        format!(
            "The {} challenge from {} to {} has expired.",
            self.kind.title(),
            self.proposer.mention(),
            self.target.mention()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_involves_both_parties() {
        let challenge = Challenge::new(
            -5,
            GameKind::Duel,
            Player::new(1, "Ann"),
            Player::new(2, "Bob"),
            77,
            false,
        );

        assert!(challenge.involves(1));
        assert!(challenge.involves(2));
        assert!(!challenge.involves(3));
        assert_eq!(challenge.expired_text(), "The Duel challenge from Ann to Bob has expired.");
    }
}
