//! The flat post cache file read by every page render.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::posts::Post;

#[derive(Debug, Error)]
pub enum PostCacheError {
    #[error("post cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("post cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("failed to replace post cache file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Clone)]
pub struct PostCache {
    path: PathBuf,
}

impl PostCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every cached post in stored order. A missing or unreadable file
    /// yields an empty list.
    pub fn load(&self) -> Vec<Post> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    target = "canopy::post_cache",
                    path = %self.path.display(),
                    "post cache file not found"
                );
                return Vec::new();
            }
            Err(err) => {
                error!(
                    target = "canopy::post_cache",
                    path = %self.path.display(),
                    error = %err,
                    "failed to read post cache"
                );
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(posts) => posts,
            Err(err) => {
                error!(
                    target = "canopy::post_cache",
                    path = %self.path.display(),
                    error = %err,
                    "failed to parse post cache"
                );
                Vec::new()
            }
        }
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<Post> {
        self.load().into_iter().find(|post| post.slug == slug)
    }

    /// Replace the cache file with `posts`.
    ///
    /// The file is written next to the target and renamed into place, so
    /// readers see either the old list or the new one.
    pub fn write(&self, posts: &[Post]) -> Result<(), PostCacheError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut staged = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut staged, posts)?;
        staged.write_all(b"\n")?;
        staged.flush()?;
        staged.persist(&self.path)?;

        info!(
            target = "canopy::post_cache",
            path = %self.path.display(),
            count = posts.len(),
            "post cache written"
        );
        Ok(())
    }
}
