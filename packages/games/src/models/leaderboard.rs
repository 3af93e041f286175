use serde::{Deserialize, Serialize};

use crate::models::game_session::GameKind;
use crate::models::player::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub leaderboard_key: String,
    pub game_kind: GameKind,
    pub player_id: PlayerId,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub draws: u32,
    #[serde(default)]
    pub win_streak: u32,
}

impl LeaderboardEntry {
    pub fn key(kind: GameKind, player_id: PlayerId) -> String {
        format!("{}#{}", kind.as_str(), player_id)
    }

    pub fn new(kind: GameKind, player_id: PlayerId) -> Self {
        LeaderboardEntry {
            leaderboard_key: Self::key(kind, player_id),
            game_kind: kind,
            player_id,
            wins: 0,
            losses: 0,
            draws: 0,
            win_streak: 0,
        }
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    pub fn apply_win(&mut self) {
        self.wins += 1;
        if self.game_kind.tracks_streak() {
            self.win_streak += 1;
        }
    }

    pub fn apply_loss(&mut self) {
        self.losses += 1;
        self.win_streak = 0;
    }

    pub fn apply_draw(&mut self) {
        self.draws += 1;
        self.win_streak = 0;
    }
}

/// Orders entries for the given game's leaderboard, best first.
pub fn rank_entries(kind: GameKind, entries: &mut [LeaderboardEntry]) {
    match kind {
        GameKind::ClubConnect => entries.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(b.draws.cmp(&a.draws))
                .then(a.losses.cmp(&b.losses))
        }),
        GameKind::Duel => entries.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(b.win_streak.cmp(&a.win_streak))
                .then(a.losses.cmp(&b.losses))
        }),
    }
}
