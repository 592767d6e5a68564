//! Persistence seam for the route lookup envelope.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::lookup::RouteLookupEnvelope;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage request failed: {0}")]
    Http(String),
    #[error("storage service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid storage connection string: {0}")]
    InvalidConnection(String),
}

impl StorageError {
    pub fn from_http(err: impl std::fmt::Display) -> Self {
        Self::Http(err.to_string())
    }
}

/// A single named blob holding the route lookup envelope.
#[async_trait]
pub trait LookupStore: Send + Sync {
    /// Human-readable backend name reported by the status endpoints.
    fn label(&self) -> &'static str;

    /// The stored envelope, or `None` when nothing has been written yet.
    async fn get(&self) -> Result<Option<RouteLookupEnvelope>, StorageError>;

    async fn set(&self, envelope: &RouteLookupEnvelope) -> Result<(), StorageError>;
}
