//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DB_FILE_NAME, MEDIA_DIR_NAME};
use crate::database::{create_pool, Repository, SqliteRepository};
use crate::error::Result;
use crate::services::{ExportService, JournalsService, ShareService, StatisticsService};
use crate::storage::MediaStore;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub repo: Arc<dyn Repository>,
    pub media: MediaStore,
    pub journals: JournalsService,
    pub statistics: StatisticsService,
    pub shares: ShareService,
    pub export: ExportService,
}

impl AppState {
    /// Initialize the SQLite-backed service stack under `data_dir`.
    ///
    /// Creates the directory layout, runs migrations, and wires every
    /// service to the shared repository handle.
    pub async fn initialize(data_dir: &Path) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("Data directory: {:?}", data_dir);

        std::fs::create_dir_all(data_dir)?;

        let pool = create_pool(&data_dir.join(DB_FILE_NAME)).await?;
        let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::new(pool));

        let media = MediaStore::new(data_dir.join(MEDIA_DIR_NAME));
        media.initialize().await?;

        let state = Self::with_repository(repo, media, data_dir.to_path_buf());

        tracing::info!("Application initialized successfully");

        Ok(state)
    }

    /// Assemble services over an already-constructed repository.
    ///
    /// [`AppState::initialize`] uses this for the SQLite backend; tests
    /// use it to run the full stack against [`MemoryRepository`].
    ///
    /// [`MemoryRepository`]: crate::database::MemoryRepository
    pub fn with_repository(
        repo: Arc<dyn Repository>,
        media: MediaStore,
        data_dir: PathBuf,
    ) -> Self {
        let journals = JournalsService::new(repo.clone());
        let statistics = StatisticsService::new(repo.clone());
        let shares = ShareService::new(repo.clone());
        let export = ExportService::new(repo.clone(), media.clone(), data_dir.clone());

        Self {
            data_dir,
            repo,
            media,
            journals,
            statistics,
            shares,
            export,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{CreateBookRequest, CreateJournalRequest, CreateUserRequest};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_initialize_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState::initialize(temp_dir.path()).await.unwrap();

        assert!(temp_dir.path().join(DB_FILE_NAME).exists());
        assert!(temp_dir.path().join(MEDIA_DIR_NAME).is_dir());

        // The stack is usable end to end
        let user = state
            .repo
            .create_user(CreateUserRequest {
                email: Some("app@example.com".into()),
                phone: None,
                display_name: "App".into(),
                avatar_ref: None,
                settings: None,
            })
            .await
            .unwrap();
        let book = state
            .journals
            .create_book(CreateBookRequest {
                owner_id: user.id.clone(),
                title: "First".into(),
                description: None,
                cover_ref: None,
                default_visibility: None,
            })
            .await
            .unwrap();
        let entry = state
            .journals
            .create_journal(CreateJournalRequest {
                owner_id: user.id,
                book_id: book.id,
                title: "Boot".into(),
                visibility: None,
                tags: Vec::new(),
                blocks: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(entry.title, "Boot");
    }

    #[tokio::test]
    async fn test_initialize_is_reusable() {
        let temp_dir = TempDir::new().unwrap();
        let user_id = {
            let state = AppState::initialize(temp_dir.path()).await.unwrap();
            state
                .repo
                .create_user(CreateUserRequest {
                    email: None,
                    phone: None,
                    display_name: "Persisted".into(),
                    avatar_ref: None,
                    settings: None,
                })
                .await
                .unwrap()
                .id
        };

        // Second boot over the same directory sees the same database
        let state = AppState::initialize(temp_dir.path()).await.unwrap();
        let user = state.repo.get_user(&user_id).await.unwrap();
        assert_eq!(user.display_name, "Persisted");
    }
}
