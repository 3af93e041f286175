pub mod catalog_errors;
pub mod game_repository_errors;
pub mod leaderboard_repository_errors;
