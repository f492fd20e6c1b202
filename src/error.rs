use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration file not found in '{0}'")]
    NotFound(PathBuf),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    BsonDecode(#[from] bson::de::Error),
    #[error(transparent)]
    BsonEncode(#[from] bson::ser::Error),
}

impl StoreError {
    /// Indicates whether a write was rejected by a unique index.
    pub fn is_duplicate_key(&self) -> bool {
        use mongodb::error::{ErrorKind, WriteFailure};

        const DUPLICATE_KEY: i32 = 11000;

        match self {
            StoreError::Conflict(_) => true,
            StoreError::Database(e) => match e.kind.as_ref() {
                ErrorKind::Write(WriteFailure::WriteError(w)) => w.code == DUPLICATE_KEY,
                ErrorKind::Command(c) => c.code == DUPLICATE_KEY,
                _ => false,
            },
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("security material unavailable: {0}")]
    Security(String),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    Cors(#[from] rocket_cors::Error),
}
