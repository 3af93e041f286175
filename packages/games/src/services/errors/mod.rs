pub mod challenge_service_errors;
pub mod game_service_errors;
pub mod transport_errors;
