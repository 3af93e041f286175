use serde::{Deserialize, Serialize};

use crate::models::game_session::Seat;

/// One answer in the duel pool: a canonical name plus accepted spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelEntity {
    pub canonical_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub photo_file: Option<String>,
}

impl DuelEntity {
    pub fn new(canonical_name: &str, aliases: &[&str]) -> Self {
        DuelEntity {
            canonical_name: canonical_name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            photo_file: None,
        }
    }

    pub fn with_photo(mut self, photo_file: &str) -> Self {
        self.photo_file = Some(photo_file.to_string());
        self
    }

    /// Every string a guess may match: the aliases followed by the canonical name.
    pub fn answers(&self) -> Vec<&str> {
        self.aliases
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.canonical_name.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelState {
    /// 1-based number of the round being played. Moves past `total_rounds`
    /// once the last round resolves and only the final tally is left.
    pub round: u32,
    pub total_rounds: u32,
    pub sequence: Vec<DuelEntity>,
    pub round_open: bool,
    pub round_start_time: i64,
    pub scores: [u32; 2],
    pub rounds_won: [u32; 2],
}

impl DuelState {
    pub fn new(sequence: Vec<DuelEntity>) -> Self {
        DuelState {
            round: 1,
            total_rounds: sequence.len() as u32,
            sequence,
            round_open: false,
            round_start_time: 0,
            scores: [0, 0],
            rounds_won: [0, 0],
        }
    }

    pub fn current_entity(&self) -> Option<&DuelEntity> {
        let index = self.round.checked_sub(1)? as usize;
        self.sequence.get(index)
    }

    pub fn is_last_round(&self) -> bool {
        self.round >= self.total_rounds
    }

    pub fn rounds_exhausted(&self) -> bool {
        self.round > self.total_rounds
    }

    pub fn award(&mut self, seat: Seat, points: u32) {
        self.scores[seat.index()] += points;
        self.rounds_won[seat.index()] += 1;
    }

    /// Seat with the higher score, or `None` on a tie.
    pub fn leader(&self) -> Option<Seat> {
        let [first, second] = self.scores;
        if first > second {
            Some(Seat::First)
        } else if second > first {
            Some(Seat::Second)
        } else {
            None
        }
    }
}

pub fn round_points(base: u32, elapsed_secs: i64) -> u32 {
    let remaining = base as i64 - elapsed_secs.max(0);
    remaining.max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence() -> Vec<DuelEntity> {
        vec![
            DuelEntity::new("messi", &["месси", "лео"]),
            DuelEntity::new("kane", &["кейн"]).with_photo("kane.jpg"),
        ]
    }

    #[test]
    fn test_round_points_decay() {
        assert_eq!(round_points(10, 0), 10);
        assert_eq!(round_points(10, 3), 7);
        assert_eq!(round_points(10, 9), 1);
        assert_eq!(round_points(10, 14), 1);
        assert_eq!(round_points(10, -2), 10);
    }

    #[test]
    fn test_answers_include_canonical_name() {
        let entity = DuelEntity::new("messi", &["месси", "лео"]);

        assert_eq!(entity.answers(), vec!["месси", "лео", "messi"]);
    }

    #[test]
    fn test_current_entity_follows_round() {
        let mut state = DuelState::new(sequence());

        assert_eq!(state.total_rounds, 2);
        assert_eq!(state.current_entity().unwrap().canonical_name, "messi");
        assert!(!state.is_last_round());

        state.round = 2;
        assert_eq!(state.current_entity().unwrap().canonical_name, "kane");
        assert!(state.is_last_round());
        assert!(!state.rounds_exhausted());

        state.round = 3;
        assert!(state.current_entity().is_none());
        assert!(state.rounds_exhausted());
    }

    #[test]
    fn test_leader() {
        let mut state = DuelState::new(sequence());
        assert_eq!(state.leader(), None);

        state.award(Seat::Second, 8);
        assert_eq!(state.leader(), Some(Seat::Second));
        assert_eq!(state.rounds_won, [0, 1]);

        state.award(Seat::First, 8);
        assert_eq!(state.leader(), None);
    }

    #[test]
    fn test_entity_deserializes_without_optional_fields() {
        let entity: DuelEntity = serde_json::from_str(r#"{"canonical_name": "kroos"}"#).unwrap();

        assert!(entity.aliases.is_empty());
        assert!(entity.photo_file.is_none());
    }
}
