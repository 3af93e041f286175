use std::fmt;
use std::str::FromStr;

use crate::models::club_connect::CellRef;
use crate::models::game_session::GameKind;
use crate::models::player::PlayerId;

/// Payload attached to an inline button and echoed back when it is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    Accept(GameKind),
    Decline(GameKind),
    Cell(CellRef),
    Rematch { winner: PlayerId, loser: PlayerId },
    Ignore,
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackData::Accept(kind) => write!(f, "accept:{}", kind),
            CallbackData::Decline(kind) => write!(f, "decline:{}", kind),
            CallbackData::Cell(cell) => write!(f, "cell:{}:{}", cell.row, cell.col),
            CallbackData::Rematch { winner, loser } => write!(f, "rematch:{}:{}", winner, loser),
            CallbackData::Ignore => write!(f, "ignore"),
        }
    }
}

impl FromStr for CallbackData {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let invalid = || format!("Invalid callback data: {}", s);
        match parts.as_slice() {
            ["accept", kind] => Ok(CallbackData::Accept(kind.parse()?)),
            ["decline", kind] => Ok(CallbackData::Decline(kind.parse()?)),
            ["cell", row, col] => {
                let row = row.parse().map_err(|_| invalid())?;
                let col = col.parse().map_err(|_| invalid())?;
                CellRef::new(row, col).map(CallbackData::Cell).ok_or_else(invalid)
            }
            ["rematch", winner, loser] => Ok(CallbackData::Rematch {
                winner: winner.parse().map_err(|_| invalid())?,
                loser: loser.parse().map_err(|_| invalid())?,
            }),
            ["ignore"] => Ok(CallbackData::Ignore),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: CallbackData,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, data: CallbackData) -> Self {
        InlineButton {
            text: text.into(),
            data,
        }
    }
}

/// Rows of buttons shown under a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        InlineKeyboard { rows }
    }

    pub fn invite(kind: GameKind) -> Self {
        InlineKeyboard::new(vec![vec![
            InlineButton::new("Accept", CallbackData::Accept(kind)),
            InlineButton::new("Decline", CallbackData::Decline(kind)),
        ]])
    }

    pub fn rematch(winner: PlayerId, loser: PlayerId) -> Self {
        InlineKeyboard::new(vec![vec![InlineButton::new(
            "Rematch!",
            CallbackData::Rematch { winner, loser },
        )]])
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}
