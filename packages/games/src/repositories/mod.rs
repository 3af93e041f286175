pub mod catalog;
pub mod errors;
pub mod game_repository;
pub mod leaderboard_repository;
pub mod memory_repository;
