use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::Level;

#[derive(Debug)]
pub enum ConfigError {
    Missing(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Missing configuration value: {}", key),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Timings and thresholds shared by both games.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub club_connect_turn_timeout: Duration,
    pub duel_round_timeout: Duration,
    pub duel_total_rounds: u32,
    pub duel_points_base: u32,
    pub duel_start_delay: Duration,
    pub duel_round_pause: Duration,
    pub invite_timeout: Duration,
    pub club_match_threshold: u8,
    pub duel_match_threshold: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            club_connect_turn_timeout: Duration::from_secs(30),
            duel_round_timeout: Duration::from_secs(15),
            duel_total_rounds: 5,
            duel_points_base: 10,
            duel_start_delay: Duration::from_secs(3),
            duel_round_pause: Duration::from_secs(4),
            invite_timeout: Duration::from_secs(60),
            club_match_threshold: 80,
            duel_match_threshold: 75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    DynamoDb,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "dynamodb" => Ok(StoreBackend::DynamoDb),
            other => Err(ConfigError::Invalid(format!("STORE_BACKEND={}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    pub game_sessions_table: String,
    pub leaderboard_table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub club_players_json: PathBuf,
    pub duel_words_json: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub game: GameConfig,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub log_level: Level,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = GameConfig::default();
        let secs = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(Duration::from_secs(parse_or(&lookup, key, default.as_secs())?))
        };

        let game = GameConfig {
            club_connect_turn_timeout: secs(
                "CLUB_CONNECT_TURN_TIMEOUT_SECS",
                defaults.club_connect_turn_timeout,
            )?,
            duel_round_timeout: secs("DUEL_ROUND_TIMEOUT_SECS", defaults.duel_round_timeout)?,
            duel_total_rounds: parse_or(&lookup, "DUEL_TOTAL_ROUNDS", defaults.duel_total_rounds)?,
            duel_points_base: parse_or(&lookup, "DUEL_POINTS_BASE", defaults.duel_points_base)?,
            duel_start_delay: secs("DUEL_START_DELAY_SECS", defaults.duel_start_delay)?,
            duel_round_pause: secs("DUEL_ROUND_PAUSE_SECS", defaults.duel_round_pause)?,
            invite_timeout: secs("INVITE_TIMEOUT_SECS", defaults.invite_timeout)?,
            club_match_threshold: parse_threshold(&lookup, "CLUB_MATCH_THRESHOLD", defaults.club_match_threshold)?,
            duel_match_threshold: parse_threshold(&lookup, "DUEL_MATCH_THRESHOLD", defaults.duel_match_threshold)?,
        };
        if game.duel_total_rounds == 0 {
            return Err(ConfigError::Invalid("DUEL_TOTAL_ROUNDS must be at least 1".to_string()));
        }

        let storage = StorageConfig {
            backend: lookup("STORE_BACKEND")
                .map(|v| v.parse::<StoreBackend>())
                .transpose()?
                .unwrap_or(StoreBackend::Memory),
            game_sessions_table: non_empty_or(&lookup, "GAME_SESSIONS_TABLE", "game_sessions")?,
            leaderboard_table: non_empty_or(&lookup, "LEADERBOARD_TABLE", "leaderboard")?,
        };

        let catalog = CatalogConfig {
            club_players_json: PathBuf::from(non_empty_or(
                &lookup,
                "CLUB_PLAYERS_JSON",
                "data/club_players.json",
            )?),
            duel_words_json: PathBuf::from(non_empty_or(
                &lookup,
                "DUEL_WORDS_JSON",
                "data/duel_words.json",
            )?),
        };

        let log_level = parse_or(&lookup, "LOG_LEVEL", Level::INFO)?;

        Ok(AppConfig {
            game,
            storage,
            catalog,
            log_level,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{}={}", key, raw))),
        None => Ok(default),
    }
}

fn parse_threshold<F>(lookup: &F, key: &str, default: u8) -> Result<u8, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if value > 100 {
        return Err(ConfigError::Invalid(format!("{} must be between 0 and 100", key)));
    }
    Ok(value)
}

fn non_empty_or<F>(lookup: &F, key: &str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if value.trim().is_empty() => Err(ConfigError::Missing(key.to_string())),
        Some(value) => Ok(value),
        None => Ok(default.to_string()),
    }
}
