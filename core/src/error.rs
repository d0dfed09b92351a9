use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid run event: {reason}")]
    InvalidEvent { reason: String },

    #[error("Customer '{name}' already has a '{network}' network")]
    DuplicateCustomer { name: String, network: String },

    #[error("Customer '{id}' not found")]
    CustomerNotFound { id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TrackResult<T> = Result<T, TrackError>;
