#[derive(Debug)]
pub enum GameRecordRepositoryError {
    NotFound,
    Serialization(String),
    DynamoDb(String),
    Storage(String),
}

impl std::fmt::Display for GameRecordRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameRecordRepositoryError::NotFound => write!(f, "Game record not found"),
            GameRecordRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            GameRecordRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            GameRecordRepositoryError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for GameRecordRepositoryError {}
