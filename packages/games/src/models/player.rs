use serde::{Deserialize, Serialize};

pub type ChatId = i64;
pub type PlayerId = i64;
pub type MessageId = i64;

/// A chat participant as resolved by the transport.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub is_bot: bool,
}

impl Player {
    pub fn new(id: PlayerId, display_name: &str) -> Self {
        Player {
            id,
            display_name: display_name.to_string(),
            is_bot: false,
        }
    }

    pub fn bot(id: PlayerId, display_name: &str) -> Self {
        Player {
            id,
            display_name: display_name.to_string(),
            is_bot: true,
        }
    }

    pub fn mention(&self) -> String {
        if self.display_name.trim().is_empty() {
            format!("player {}", self.id)
        } else {
            self.display_name.clone()
        }
    }
}
