#[derive(Debug)]
pub enum CatalogError {
    Io(String),
    Parse(String),
    Insufficient(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(msg) => write!(f, "Catalog I/O error: {}", msg),
            CatalogError::Parse(msg) => write!(f, "Catalog parse error: {}", msg),
            CatalogError::Insufficient(msg) => write!(f, "Catalog has too little data: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}
