pub mod callback;
pub mod challenge;
pub mod chat_event;
pub mod club_connect;
pub mod duel;
pub mod game_session;
pub mod leaderboard;
pub mod player;
