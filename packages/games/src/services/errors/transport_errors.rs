#[derive(Debug)]
pub enum TransportError {
    NotFound(String),
    Rejected(String),
    Unavailable(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::NotFound(msg) => write!(f, "Not found: {}", msg),
            TransportError::Rejected(msg) => write!(f, "Rejected by chat platform: {}", msg),
            TransportError::Unavailable(msg) => write!(f, "Chat platform unavailable: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}
