use serde::{Deserialize, Serialize};

use crate::models::game_session::Seat;
use crate::models::player::MessageId;

pub const GRID_SIZE: usize = 3;

/// The eight three-in-a-row lines of a 3x3 grid, as cell indexes.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Option<Self> {
        if row < GRID_SIZE && col < GRID_SIZE {
            Some(CellRef { row, col })
        } else {
            None
        }
    }

    pub fn index(&self) -> usize {
        self.row * GRID_SIZE + self.col
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardOutcome {
    Won(Seat),
    Draw,
    InProgress,
}

/// Board cells are stored as a nine-character string of `X`, `O` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Board {
    cells: [Option<Seat>; 9],
}

impl Board {
    pub fn new() -> Self {
        Board::default()
    }

    pub fn get(&self, cell: CellRef) -> Option<Seat> {
        self.cells[cell.index()]
    }

    pub fn is_empty_at(&self, cell: CellRef) -> bool {
        self.get(cell).is_none()
    }

    /// Places a mark. Returns false when the cell is already taken.
    pub fn claim(&mut self, cell: CellRef, seat: Seat) -> bool {
        let slot = &mut self.cells[cell.index()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(seat);
        true
    }

    pub fn winner(&self) -> Option<Seat> {
        WIN_LINES.iter().find_map(|[a, b, c]| {
            match (self.cells[*a], self.cells[*b], self.cells[*c]) {
                (Some(x), Some(y), Some(z)) if x == y && y == z => Some(x),
                _ => None,
            }
        })
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn outcome(&self) -> BoardOutcome {
        if let Some(seat) = self.winner() {
            BoardOutcome::Won(seat)
        } else if self.is_full() {
            BoardOutcome::Draw
        } else {
            BoardOutcome::InProgress
        }
    }

    pub fn to_symbols(&self) -> String {
        self.cells
            .iter()
            .map(|cell| cell.map(Seat::symbol).unwrap_or('.'))
            .collect()
    }

    pub fn from_symbols(symbols: &str) -> Result<Self, String> {
        let chars: Vec<char> = symbols.chars().collect();
        if chars.len() != GRID_SIZE * GRID_SIZE {
            return Err(format!("Board must have 9 cells, got {}", chars.len()));
        }
        let mut board = Board::new();
        for (i, ch) in chars.into_iter().enumerate() {
            board.cells[i] = match ch {
                'X' => Some(Seat::First),
                'O' => Some(Seat::Second),
                '.' => None,
                other => return Err(format!("Invalid board symbol: {}", other)),
            };
        }
        Ok(board)
    }
}

impl From<Board> for String {
    fn from(board: Board) -> Self {
        board.to_symbols()
    }
}

impl TryFrom<String> for Board {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Board::from_symbols(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubConnectState {
    pub board: Board,
    pub turn: Seat,
    pub clubs_rows: Vec<String>,
    pub clubs_cols: Vec<String>,
    #[serde(skip)]
    pub selected_cell: Option<CellRef>,
    /// Message carrying the live cell buttons. Presses on any other board are stale.
    #[serde(skip)]
    pub board_message_id: Option<MessageId>,
}

impl ClubConnectState {
    pub fn new(clubs_rows: Vec<String>, clubs_cols: Vec<String>) -> Self {
        ClubConnectState {
            board: Board::new(),
            turn: Seat::First,
            clubs_rows,
            clubs_cols,
            selected_cell: None,
            board_message_id: None,
        }
    }

    /// The (row club, column club) pair a cell sits on.
    pub fn clubs_for(&self, cell: CellRef) -> Option<(&str, &str)> {
        let row = self.clubs_rows.get(cell.row)?;
        let col = self.clubs_cols.get(cell.col)?;
        Some((row.as_str(), col.as_str()))
    }

    /// True when presses on `message_id` belong to the current board. Before
    /// any board is known (a restart whose announcement failed) every board counts.
    pub fn is_live_board(&self, message_id: MessageId) -> bool {
        self.board_message_id.map_or(true, |live| live == message_id)
    }

    /// Hands the turn to the other seat and forgets any selection.
    pub fn pass_turn(&mut self) {
        self.turn = self.turn.other();
        self.selected_cell = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case([0, 1, 2])]
    #[case([3, 4, 5])]
    #[case([6, 7, 8])]
    #[case([0, 3, 6])]
    #[case([1, 4, 7])]
    #[case([2, 5, 8])]
    #[case([0, 4, 8])]
    #[case([2, 4, 6])]
    fn test_every_line_wins(#[case] line: [usize; 3]) {
        for seat in [Seat::First, Seat::Second] {
            let mut board = Board::new();
            for index in line {
                let cell = CellRef::new(index / 3, index % 3).unwrap();
                assert!(board.claim(cell, seat));
            }

            assert_eq!(board.winner(), Some(seat));
            assert_eq!(board.outcome(), BoardOutcome::Won(seat));
        }
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        let board = Board::from_symbols("XOXXOOOXX").unwrap();

        assert!(board.is_full());
        assert_eq!(board.winner(), None);
        assert_eq!(board.outcome(), BoardOutcome::Draw);
    }

    #[test]
    fn test_empty_board_in_progress() {
        assert_eq!(Board::new().outcome(), BoardOutcome::InProgress);
    }

    #[test]
    fn test_claim_rejects_occupied_cell() {
        let mut board = Board::new();
        let cell = CellRef::new(1, 2).unwrap();

        assert!(board.claim(cell, Seat::First));
        assert!(!board.claim(cell, Seat::Second));
        assert_eq!(board.get(cell), Some(Seat::First));
    }

    #[test]
    fn test_cell_ref_range() {
        assert!(CellRef::new(2, 2).is_some());
        assert!(CellRef::new(3, 0).is_none());
        assert!(CellRef::new(0, 3).is_none());
        assert_eq!(CellRef::new(2, 1).unwrap().index(), 7);
    }

    #[test]
    fn test_board_symbols() {
        let mut board = Board::new();
        board.claim(CellRef::new(0, 0).unwrap(), Seat::First);
        board.claim(CellRef::new(2, 2).unwrap(), Seat::Second);

        assert_eq!(board.to_symbols(), "X.......O");
        assert_eq!(Board::from_symbols("X.......O").unwrap(), board);
        assert!(Board::from_symbols("X..").is_err());
        assert!(Board::from_symbols("X.......Z").is_err());
    }

    #[test]
    fn test_state_serializes_board_as_string() {
        let mut state = ClubConnectState::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec!["d".into(), "e".into(), "f".into()],
        );
        state.board.claim(CellRef::new(1, 1).unwrap(), Seat::Second);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["board"], "....O....");
        assert_eq!(json["turn"], "first");
        assert!(json.get("selected_cell").is_none());
        assert!(json.get("board_message_id").is_none());
    }

    #[test]
    fn test_board_message_is_live_until_replaced() {
        let mut state = ClubConnectState::new(vec![], vec![]);
        assert!(state.is_live_board(7));

        state.board_message_id = Some(4);

        assert!(state.is_live_board(4));
        assert!(!state.is_live_board(7));
    }

    #[test]
    fn test_pass_turn_clears_selection() {
        let mut state = ClubConnectState::new(vec![], vec![]);
        state.selected_cell = CellRef::new(0, 0);

        state.pass_turn();

        assert_eq!(state.turn, Seat::Second);
        assert!(state.selected_cell.is_none());
    }
}
