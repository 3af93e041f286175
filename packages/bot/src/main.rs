use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn, Level};

use games::config::{AppConfig, StoreBackend};
use games::repositories::catalog::{ClubCatalog, DuelPool};
use games::repositories::game_repository::{DynamoDbGameRecordRepository, GameRecordRepository};
use games::repositories::leaderboard_repository::{
    DynamoDbLeaderboardRepository, LeaderboardRepository,
};
use games::repositories::memory_repository::{
    InMemoryGameRecordRepository, InMemoryLeaderboardRepository,
};
use games::services::game_context::GameContext;
use games::services::game_hub::GameHub;

mod console;

use console::ConsoleTransport;

type Stores = (
    Arc<dyn GameRecordRepository + Send + Sync>,
    Arc<dyn LeaderboardRepository + Send + Sync>,
);

async fn build_stores(config: &AppConfig) -> Stores {
    match config.storage.backend {
        StoreBackend::Memory => {
            info!("Using in-memory storage");
            let games: Arc<dyn GameRecordRepository + Send + Sync> =
                Arc::new(InMemoryGameRecordRepository::new());
            let leaderboard: Arc<dyn LeaderboardRepository + Send + Sync> =
                Arc::new(InMemoryLeaderboardRepository::new());
            (games, leaderboard)
        }
        StoreBackend::DynamoDb => {
            info!(
                games_table = %config.storage.game_sessions_table,
                leaderboard_table = %config.storage.leaderboard_table,
                "Using DynamoDB storage"
            );
            let aws = aws_config::load_from_env().await;
            let client = aws_sdk_dynamodb::Client::new(&aws);
            let games: Arc<dyn GameRecordRepository + Send + Sync> = Arc::new(
                DynamoDbGameRecordRepository::new(client.clone(), &config.storage.game_sessions_table),
            );
            let leaderboard: Arc<dyn LeaderboardRepository + Send + Sync> = Arc::new(
                DynamoDbLeaderboardRepository::new(client, &config.storage.leaderboard_table),
            );
            (games, leaderboard)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    let level = config.as_ref().map(|c| c.log_level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
    let config = config.map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    // Missing data files disable the affected game instead of stopping the bot
    let catalog = ClubCatalog::load(&config.catalog.club_players_json).unwrap_or_else(|e| {
        warn!(error = %e, "Club Connect is unavailable");
        ClubCatalog::empty()
    });
    let pool = DuelPool::load(&config.catalog.duel_words_json).unwrap_or_else(|e| {
        warn!(error = %e, "Duel is unavailable");
        DuelPool::empty()
    });

    let (games, leaderboard) = build_stores(&config).await;
    let ctx = Arc::new(GameContext::new(
        games,
        leaderboard,
        Arc::new(ConsoleTransport::new()),
        config.game.clone(),
    ));
    let hub = GameHub::new(ctx, Arc::new(catalog), Arc::new(pool));

    match hub.recover().await {
        Ok(report) => info!(restored = report.restored, failed = report.failed, "Recovered games"),
        Err(e) => error!(error = %e, "Failed to load active games"),
    }

    info!("Bot ready, reading events from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match console::parse_line(&line) {
                    Ok(Some(event)) => hub.handle(event).await,
                    Ok(None) => {}
                    Err(e) => warn!(input = %line, error = %e, "Could not parse input"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let running = hub.context().registry.active_sessions().await.len();
                info!(running, "Shutting down, running games resume on the next start");
                break;
            }
        }
    }

    Ok(())
}
