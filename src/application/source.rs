//! The content source seam: where published posts come from.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::{Post, PostSummary};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to content source failed: {0}")]
    Http(String),
    #[error("content source returned {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },
    #[error("failed to decode content source response: {0}")]
    Decode(String),
    #[error("content source misconfigured: {0}")]
    Configuration(String),
}

impl SourceError {
    pub fn from_http(err: impl std::fmt::Display) -> Self {
        Self::Http(err.to_string())
    }

    pub fn from_decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    /// API error code reported by the source, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Status { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

/// Read access to published documents in the CMS.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Documents passing the publication filter, newest first.
    async fn published_posts(&self) -> Result<Vec<PostSummary>, SourceError>;

    /// One document's properties and rendered body.
    async fn fetch_post(&self, document_id: &str) -> Result<Post, SourceError>;
}
