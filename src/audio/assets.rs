//! Asset resolution for media references.

use std::path::PathBuf;

use tracing::debug;

use crate::{error::EngineError, library::MediaRef};

/// Resolves media references to playable files.
pub trait AssetSource: Send + Sync {
    /// Resolves `media` to a file path.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::AssetNotFound` if the asset does not exist.
    fn resolve(&self, media: &MediaRef) -> Result<PathBuf, EngineError>;
}

/// Resolves references relative to an asset directory and checks that the
/// file exists.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    /// Creates a resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectoryAssets {
    fn resolve(&self, media: &MediaRef) -> Result<PathBuf, EngineError> {
        let path = self.root.join(media.as_str());
        if path.is_file() {
            Ok(path)
        } else {
            debug!("Asset {} not found at {:?}", media, path);
            Err(EngineError::AssetNotFound {
                media: media.to_string(),
            })
        }
    }
}

/// Accepts every reference as a path without touching the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct UncheckedAssets;

impl AssetSource for UncheckedAssets {
    fn resolve(&self, media: &MediaRef) -> Result<PathBuf, EngineError> {
        Ok(PathBuf::from(media.as_str()))
    }
}
