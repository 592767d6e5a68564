use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

use super::{posts::PostCacheError, refresh::RefreshError, source::SourceError};

/// Failures that end a command and set a non-zero exit status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    PostCache(#[from] PostCacheError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<RefreshError> for AppError {
    fn from(error: RefreshError) -> Self {
        match error {
            RefreshError::Source(err) => AppError::Source(err),
            RefreshError::PostCache(err) => AppError::PostCache(err),
        }
    }
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_errors_keep_their_source_variant() {
        let err = AppError::from(RefreshError::Source(SourceError::Status {
            status: 401,
            code: "unauthorized".to_string(),
            message: "API token is invalid.".to_string(),
        }));
        assert!(matches!(
            err,
            AppError::Source(SourceError::Status { ref code, .. }) if code == "unauthorized"
        ));

        let io = std::io::Error::other("disk full");
        let err = AppError::from(RefreshError::PostCache(PostCacheError::from(io)));
        assert_eq!(err.to_string(), "post cache io error: disk full");
    }
}
