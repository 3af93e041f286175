#[derive(Debug)]
pub enum LeaderboardRepositoryError {
    Serialization(String),
    DynamoDb(String),
    Storage(String),
}

impl std::fmt::Display for LeaderboardRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaderboardRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            LeaderboardRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            LeaderboardRepositoryError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for LeaderboardRepositoryError {}
