//! Content-addressed media storage
//!
//! Stores image bytes using their SHA-256 hash as key. Image blocks,
//! avatars, and book covers reference these hashes. Files are organized
//! in a two-level directory structure for performance.
//!
//! Example: hash "abcd1234..." is stored at "media/ab/cd/abcd1234..."

use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Content-addressed media store
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Create a new media store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the media store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Media store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Store bytes, returning their SHA-256 hash
    pub async fn store(&self, data: &[u8]) -> Result<String> {
        let hash = calculate_hash(data);

        // Identical content is already on disk under the same name
        if self.exists(&hash).await? {
            tracing::debug!("Media object already exists: {}", hash);
            return Ok(hash);
        }

        let path = self
            .path_for(&hash)
            .ok_or_else(|| AppError::MediaStore(format!("Invalid media hash: {hash}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to temp file first (atomic write)
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        // Rename to final location
        fs::rename(temp_path, &path).await?;

        tracing::debug!("Stored media object: {} ({} bytes)", hash, data.len());

        Ok(hash)
    }

    /// Load the bytes for a hash
    pub async fn load(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self
            .path_for(hash)
            .filter(|p| p.exists())
            .ok_or_else(|| AppError::MediaStore(format!("Media object not found: {hash}")))?;

        let data = fs::read(&path).await?;

        tracing::debug!("Loaded media object: {} ({} bytes)", hash, data.len());

        Ok(data)
    }

    /// Check whether a hash is stored
    pub async fn exists(&self, hash: &str) -> Result<bool> {
        Ok(self.path_for(hash).map(|p| p.exists()).unwrap_or(false))
    }

    /// Remove a media object. Removing an unknown hash is a no-op.
    pub async fn remove(&self, hash: &str) -> Result<()> {
        let Some(path) = self.path_for(hash) else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path).await?;

        tracing::debug!("Removed media object: {}", hash);

        Ok(())
    }

    /// File path for a hash, or None when the hash is too short to fan
    /// out into the two-level layout.
    fn path_for(&self, hash: &str) -> Option<PathBuf> {
        if hash.len() < 4 || !hash.is_char_boundary(2) || !hash.is_char_boundary(4) {
            return None;
        }
        // Two-level directory structure: media/ab/cd/abcd1234...
        let prefix1 = &hash[0..2];
        let prefix2 = &hash[2..4];
        Some(self.root.join(prefix1).join(prefix2).join(hash))
    }

    /// Media store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// SHA-256 of the data as lowercase hex
pub fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
