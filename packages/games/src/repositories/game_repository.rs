use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value, to_item};

use crate::models::game_session::{GameKind, GameSession, GameStatus};
use crate::models::player::ChatId;
use crate::repositories::errors::game_repository_errors::GameRecordRepositoryError;

#[cfg(test)]
use mockall::automock;

const STATUS_INDEX: &str = "GSI_GamesByStatus";
const CHAT_INDEX: &str = "GSI_GamesByChat";

/// Sorts finished and canceled sessions newest first and keeps `limit` of them.
pub fn select_history(mut sessions: Vec<GameSession>, limit: usize) -> Vec<GameSession> {
    sessions.retain(|s| matches!(s.status, GameStatus::Finished | GameStatus::Canceled));
    sessions.sort_by(|a, b| b.ended_at.unwrap_or(0).cmp(&a.ended_at.unwrap_or(0)));
    sessions.truncate(limit);
    sessions
}

pub struct DynamoDbGameRecordRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbGameRecordRepository {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    async fn query_chat(
        &self,
        chat_id: ChatId,
        kind: GameKind,
    ) -> Result<Vec<GameSession>, GameRecordRepositoryError> {
        let chat_value: AttributeValue = to_attribute_value(chat_id)
            .map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))?;
        let kind_value = AttributeValue::S(kind.as_str().to_string());

        let mut sessions = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(CHAT_INDEX)
                .key_condition_expression("chat_id = :chat_id")
                .filter_expression("#kind = :kind")
                .expression_attribute_names("#kind", "kind")
                .expression_attribute_values(":chat_id", chat_value.clone())
                .expression_attribute_values(":kind", kind_value.clone())
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| GameRecordRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let session: GameSession = from_item(item)
                    .map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))?;
                sessions.push(session);
            }

            start_key = output.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }
        Ok(sessions)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameRecordRepository: Send + Sync {
    async fn create_game(&self, session: &GameSession) -> Result<(), GameRecordRepositoryError>;

    /// Full row overwrite. Fails with `NotFound` when the row was never created.
    async fn update_game(&self, session: &GameSession) -> Result<(), GameRecordRepositoryError>;

    async fn get_game(&self, id: &str) -> Result<GameSession, GameRecordRepositoryError>;

    async fn list_active_by_chat(
        &self,
        chat_id: ChatId,
        kind: GameKind,
    ) -> Result<Vec<GameSession>, GameRecordRepositoryError>;

    async fn list_active(&self) -> Result<Vec<GameSession>, GameRecordRepositoryError>;

    async fn list_history_by_chat(
        &self,
        chat_id: ChatId,
        kind: GameKind,
        limit: usize,
    ) -> Result<Vec<GameSession>, GameRecordRepositoryError>;
}

#[async_trait]
impl GameRecordRepository for DynamoDbGameRecordRepository {
    async fn create_game(&self, session: &GameSession) -> Result<(), GameRecordRepositoryError> {
        let item = to_item(session.persisted())
            .map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(|e| GameRecordRepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    async fn update_game(&self, session: &GameSession) -> Result<(), GameRecordRepositoryError> {
        let item = to_item(session.persisted())
            .map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_exists(id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("ConditionalCheckFailedException") {
                    Err(GameRecordRepositoryError::NotFound)
                } else {
                    Err(GameRecordRepositoryError::DynamoDb(error_str))
                }
            }
        }
    }

    async fn get_game(&self, id: &str) -> Result<GameSession, GameRecordRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "id",
                to_attribute_value(id)
                    .map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| GameRecordRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => {
                from_item(item).map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))
            }
            None => Err(GameRecordRepositoryError::NotFound),
        }
    }

    async fn list_active_by_chat(
        &self,
        chat_id: ChatId,
        kind: GameKind,
    ) -> Result<Vec<GameSession>, GameRecordRepositoryError> {
        let sessions = self.query_chat(chat_id, kind).await?;
        Ok(sessions.into_iter().filter(GameSession::is_active).collect())
    }

    async fn list_active(&self) -> Result<Vec<GameSession>, GameRecordRepositoryError> {
        let mut sessions = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;
        loop {
            // STATUS is a DynamoDB reserved word.
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(STATUS_INDEX)
                .key_condition_expression("#status = :active")
                .expression_attribute_names("#status", "status")
                .expression_attribute_values(
                    ":active",
                    AttributeValue::S(GameStatus::Active.as_str().to_string()),
                )
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| GameRecordRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let session: GameSession = from_item(item)
                    .map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))?;
                sessions.push(session);
            }

            start_key = output.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }
        Ok(sessions)
    }

    async fn list_history_by_chat(
        &self,
        chat_id: ChatId,
        kind: GameKind,
        limit: usize,
    ) -> Result<Vec<GameSession>, GameRecordRepositoryError> {
        let sessions = self.query_chat(chat_id, kind).await?;
        Ok(select_history(sessions, limit))
    }
}
