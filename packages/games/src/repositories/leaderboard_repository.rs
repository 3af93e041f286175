use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value};
use tracing::debug;

use crate::models::game_session::GameKind;
use crate::models::leaderboard::{rank_entries, LeaderboardEntry};
use crate::models::player::PlayerId;
use crate::repositories::errors::leaderboard_repository_errors::LeaderboardRepositoryError;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tally {
    Win,
    Loss,
    Draw,
}

/// Update expression for one counter bump; rows are created on first write.
fn update_expression(kind: GameKind, tally: Tally) -> &'static str {
    match (tally, kind.tracks_streak()) {
        (Tally::Win, true) => "SET game_kind = :kind, player_id = :pid ADD wins :one, win_streak :one",
        (Tally::Win, false) => "SET game_kind = :kind, player_id = :pid ADD wins :one",
        (Tally::Loss, _) => "SET game_kind = :kind, player_id = :pid, win_streak = :zero ADD losses :one",
        (Tally::Draw, _) => "SET game_kind = :kind, player_id = :pid, win_streak = :zero ADD draws :one",
    }
}

pub struct DynamoDbLeaderboardRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbLeaderboardRepository {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    fn build_tally(
        &self,
        kind: GameKind,
        player_id: PlayerId,
        tally: Tally,
    ) -> Result<TransactWriteItem, LeaderboardRepositoryError> {
        let serialize = |e: serde_dynamo::Error| LeaderboardRepositoryError::Serialization(e.to_string());
        let key = HashMap::from([(
            "leaderboard_key".to_string(),
            AttributeValue::S(LeaderboardEntry::key(kind, player_id)),
        )]);

        let mut update = Update::builder()
            .table_name(&self.table_name)
            .set_key(Some(key))
            .update_expression(update_expression(kind, tally))
            .expression_attribute_values(":kind", to_attribute_value(kind).map_err(serialize)?)
            .expression_attribute_values(":pid", to_attribute_value(player_id).map_err(serialize)?)
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()));
        if tally != Tally::Win {
            update = update.expression_attribute_values(":zero", AttributeValue::N("0".to_string()));
        }
        let update = update
            .build()
            .map_err(|e| LeaderboardRepositoryError::DynamoDb(format!("Failed to build update: {:?}", e)))?;

        Ok(TransactWriteItem::builder().update(update).build())
    }

    async fn write_tallies(
        &self,
        items: Vec<TransactWriteItem>,
    ) -> Result<(), LeaderboardRepositoryError> {
        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|e| LeaderboardRepositoryError::DynamoDb(e.to_string()))?;
        Ok(())
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    async fn record_result(
        &self,
        kind: GameKind,
        winner_id: PlayerId,
        loser_id: PlayerId,
    ) -> Result<(), LeaderboardRepositoryError>;

    async fn record_draw(
        &self,
        kind: GameKind,
        player_a: PlayerId,
        player_b: PlayerId,
    ) -> Result<(), LeaderboardRepositoryError>;

    async fn top(
        &self,
        kind: GameKind,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardRepositoryError>;

    async fn stats(
        &self,
        kind: GameKind,
        player_id: PlayerId,
    ) -> Result<Option<LeaderboardEntry>, LeaderboardRepositoryError>;
}

#[async_trait]
impl LeaderboardRepository for DynamoDbLeaderboardRepository {
    async fn record_result(
        &self,
        kind: GameKind,
        winner_id: PlayerId,
        loser_id: PlayerId,
    ) -> Result<(), LeaderboardRepositoryError> {
        debug!(%kind, winner_id, loser_id, "Recording result");
        let items = vec![
            self.build_tally(kind, winner_id, Tally::Win)?,
            self.build_tally(kind, loser_id, Tally::Loss)?,
        ];
        self.write_tallies(items).await
    }

    async fn record_draw(
        &self,
        kind: GameKind,
        player_a: PlayerId,
        player_b: PlayerId,
    ) -> Result<(), LeaderboardRepositoryError> {
        debug!(%kind, player_a, player_b, "Recording draw");
        let items = vec![
            self.build_tally(kind, player_a, Tally::Draw)?,
            self.build_tally(kind, player_b, Tally::Draw)?,
        ];
        self.write_tallies(items).await
    }

    async fn top(
        &self,
        kind: GameKind,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardRepositoryError> {
        let mut entries = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("game_kind = :kind")
                .expression_attribute_values(":kind", AttributeValue::S(kind.as_str().to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| LeaderboardRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let entry: LeaderboardEntry = from_item(item)
                    .map_err(|e| LeaderboardRepositoryError::Serialization(e.to_string()))?;
                entries.push(entry);
            }

            start_key = output.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }

        rank_entries(kind, &mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn stats(
        &self,
        kind: GameKind,
        player_id: PlayerId,
    ) -> Result<Option<LeaderboardEntry>, LeaderboardRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "leaderboard_key",
                AttributeValue::S(LeaderboardEntry::key(kind, player_id)),
            )
            .send()
            .await
            .map_err(|e| LeaderboardRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => {
                let entry = from_item(item)
                    .map_err(|e| LeaderboardRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }
}
