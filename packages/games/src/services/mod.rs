pub mod challenge_service;
pub mod chat_transport;
pub mod club_connect_service;
pub mod duel_service;
pub mod errors;
pub mod game_context;
pub mod game_hub;
pub mod matcher;
pub mod recovery_service;
pub mod session_registry;
pub mod stats_service;
pub mod timer_service;
