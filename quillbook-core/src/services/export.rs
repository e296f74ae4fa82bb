//! Export service
//!
//! Renders journal entries to Markdown and packages whole books as ZIP
//! bundles: a `book.json` manifest, one numbered Markdown file per entry
//! in chronological order, and every referenced media object.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::config::{EXPORTS_DIR_NAME, MAX_EXPORT_SLUG_LENGTH};
use crate::database::{BlockContent, Book, JournalEntry, Repository};
use crate::error::{AppError, Result};
use crate::markdown;
use crate::storage::MediaStore;

/// Bundle manifest written as `book.json`
#[derive(Debug, Serialize, Deserialize)]
pub struct BookManifest {
    pub version: String,
    pub generated_at: String,
    pub book_id: String,
    pub title: String,
    pub description: Option<String>,
    pub entries: Vec<EntryManifest>,
    /// Hashes bundled under `media/`; referenced-but-missing objects are
    /// skipped and therefore absent from this list.
    pub media: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntryManifest {
    pub id: String,
    pub file: String,
    pub title: String,
    pub created_at: String,
    pub tags: Vec<String>,
}

/// Service for exporting journals and books
#[derive(Clone)]
pub struct ExportService {
    repo: Arc<dyn Repository>,
    media: MediaStore,
    exports_dir: PathBuf,
}

impl ExportService {
    pub fn new(repo: Arc<dyn Repository>, media: MediaStore, data_dir: PathBuf) -> Self {
        let exports_dir = data_dir.join(EXPORTS_DIR_NAME);
        Self {
            repo,
            media,
            exports_dir,
        }
    }

    /// Render one entry as a Markdown document
    pub async fn export_journal_markdown(&self, journal_id: &str) -> Result<String> {
        let entry = self.repo.get_journal(journal_id).await?;
        Ok(markdown::render_journal(&entry))
    }

    /// Export a book into the default exports directory
    pub async fn export_book(&self, book_id: &str) -> Result<PathBuf> {
        let exports_dir = self.exports_dir.clone();
        self.export_book_to(book_id, &exports_dir).await
    }

    /// Export a book as a ZIP bundle under `dest_dir`.
    ///
    /// Returns the path of the written bundle. Media objects referenced
    /// by blocks or the cover but absent from the store are logged and
    /// skipped rather than failing the export.
    pub async fn export_book_to(&self, book_id: &str, dest_dir: &Path) -> Result<PathBuf> {
        tracing::info!("Exporting book: {}", book_id);

        if dest_dir.exists() && !dest_dir.is_dir() {
            return Err(AppError::Export(format!(
                "Export destination is not a directory: {}",
                dest_dir.display()
            )));
        }
        fs::create_dir_all(dest_dir).await?;

        let book = self.repo.get_book(book_id).await?;
        let entries = self.repo.get_journals_by_book(book_id).await?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let bundle_name = format!("{}_{}.zip", slug(&book.title), timestamp);
        let bundle_path = dest_dir.join(&bundle_name);

        let mut manifest = BookManifest {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now().to_rfc3339(),
            book_id: book.id.clone(),
            title: book.title.clone(),
            description: book.description.clone(),
            entries: Vec::new(),
            media: Vec::new(),
        };

        let file = std::fs::File::create(&bundle_path)?;
        let mut zip = ZipWriter::new(file);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

        // Entries arrive in chronological order; number them accordingly
        for (index, entry) in entries.iter().enumerate() {
            let file_name = format!("{:03}-{}.md", index + 1, slug(&entry.title));
            let document = markdown::render_journal(entry);

            zip.start_file(&file_name, options)?;
            std::io::Write::write_all(&mut zip, document.as_bytes())?;

            manifest.entries.push(EntryManifest {
                id: entry.id.clone(),
                file: file_name,
                title: entry.title.clone(),
                created_at: entry.created_at.to_rfc3339(),
                tags: entry.tags.clone(),
            });
        }

        tracing::debug!("Added {} entries to bundle", manifest.entries.len());

        for hash in referenced_media(&book, &entries) {
            match self.media.load(&hash).await {
                Ok(bytes) => {
                    zip.start_file(&format!("media/{hash}"), options)?;
                    std::io::Write::write_all(&mut zip, &bytes)?;
                    manifest.media.push(hash);
                }
                Err(AppError::MediaStore(_)) => {
                    tracing::warn!("Referenced media object missing, skipping: {}", hash);
                }
                Err(err) => return Err(err),
            }
        }

        let manifest_json = serde_json::to_string_pretty(&manifest)?;
        zip.start_file("book.json", options)?;
        std::io::Write::write_all(&mut zip, manifest_json.as_bytes())?;

        zip.finish()?;

        tracing::info!("Book exported: {:?}", bundle_path);
        Ok(bundle_path)
    }
}

/// Media hashes referenced by the book cover and its entries' image blocks
fn referenced_media(book: &Book, entries: &[JournalEntry]) -> BTreeSet<String> {
    let mut hashes = BTreeSet::new();
    if let Some(cover) = &book.cover_ref {
        hashes.insert(cover.clone());
    }
    for entry in entries {
        for block in &entry.blocks {
            if let BlockContent::Image { image_id, .. } = &block.content {
                hashes.insert(image_id.clone());
            }
        }
    }
    hashes
}

/// Filesystem-safe slug from a title
fn slug(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_EXPORT_SLUG_LENGTH {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        CreateBlockRequest, CreateBookRequest, CreateJournalRequest, CreateUserRequest,
        MemoryRepository,
    };
    use tempfile::TempDir;

    async fn create_test_service() -> (ExportService, Arc<MemoryRepository>, String, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(MemoryRepository::new());
        let media = MediaStore::new(temp_dir.path().join("media"));
        media.initialize().await.unwrap();

        let user = repo
            .create_user(CreateUserRequest {
                email: None,
                phone: None,
                display_name: "Test".into(),
                avatar_ref: None,
                settings: None,
            })
            .await
            .unwrap();

        let service = ExportService::new(repo.clone(), media, temp_dir.path().to_path_buf());
        (service, repo, user.id, temp_dir)
    }

    async fn create_book(repo: &MemoryRepository, owner: &str, title: &str) -> String {
        repo.create_book(CreateBookRequest {
            owner_id: owner.to_string(),
            title: title.to_string(),
            description: Some("A test book".into()),
            cover_ref: None,
            default_visibility: None,
        })
        .await
        .unwrap()
        .id
    }

    fn read_manifest(bundle: &Path) -> BookManifest {
        let data = std::fs::read(bundle).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        let mut manifest_file = archive.by_name("book.json").unwrap();
        let mut manifest_json = String::new();
        std::io::Read::read_to_string(&mut manifest_file, &mut manifest_json).unwrap();
        serde_json::from_str(&manifest_json).unwrap()
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("A Day at the Beach!"), "a-day-at-the-beach");
        assert_eq!(slug("   "), "untitled");
        assert_eq!(slug("Üben"), "ben");
        assert!(slug(&"x".repeat(100)).len() <= MAX_EXPORT_SLUG_LENGTH);
    }

    #[tokio::test]
    async fn test_export_journal_markdown() {
        let (service, repo, owner, _temp) = create_test_service().await;
        let book_id = create_book(&repo, &owner, "Travels").await;

        let entry = repo
            .create_journal(CreateJournalRequest {
                owner_id: owner,
                book_id,
                title: "Lisbon".into(),
                visibility: None,
                tags: vec!["travel".into()],
                blocks: vec![CreateBlockRequest {
                    order_index: 0,
                    content: BlockContent::text("hello world"),
                }],
            })
            .await
            .unwrap();

        let document = service.export_journal_markdown(&entry.id).await.unwrap();
        assert!(document.starts_with("# Lisbon\n"));
        assert!(document.contains("hello world"));
    }

    #[tokio::test]
    async fn test_export_book_bundle() {
        let (service, repo, owner, temp) = create_test_service().await;
        let book_id = create_book(&repo, &owner, "Travels").await;

        let image_hash = service.media.store(b"fake image bytes").await.unwrap();
        for (title, content) in [
            ("First day", BlockContent::text("words here")),
            ("Second day", BlockContent::image(image_hash.clone())),
        ] {
            repo.create_journal(CreateJournalRequest {
                owner_id: owner.clone(),
                book_id: book_id.clone(),
                title: title.into(),
                visibility: None,
                tags: Vec::new(),
                blocks: vec![CreateBlockRequest {
                    order_index: 0,
                    content,
                }],
            })
            .await
            .unwrap();
        }

        let bundle = service
            .export_book_to(&book_id, &temp.path().join("out"))
            .await
            .unwrap();
        assert!(bundle.exists());

        let manifest = read_manifest(&bundle);
        assert_eq!(manifest.title, "Travels");
        assert_eq!(manifest.entries.len(), 2);
        assert_eq!(manifest.entries[0].file, "001-first-day.md");
        assert_eq!(manifest.entries[1].file, "002-second-day.md");
        assert_eq!(manifest.media, vec![image_hash.clone()]);

        let data = std::fs::read(&bundle).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        assert!(archive.by_name(&format!("media/{image_hash}")).is_ok());
    }

    #[tokio::test]
    async fn test_export_tolerates_missing_media() {
        let (service, repo, owner, _temp) = create_test_service().await;
        let book_id = create_book(&repo, &owner, "Sparse").await;

        repo.create_journal(CreateJournalRequest {
            owner_id: owner,
            book_id: book_id.clone(),
            title: "Broken image".into(),
            visibility: None,
            tags: Vec::new(),
            blocks: vec![CreateBlockRequest {
                order_index: 0,
                content: BlockContent::image("0".repeat(64)),
            }],
        })
        .await
        .unwrap();

        let bundle = service.export_book(&book_id).await.unwrap();
        let manifest = read_manifest(&bundle);
        assert_eq!(manifest.entries.len(), 1);
        assert!(manifest.media.is_empty());
    }

    #[tokio::test]
    async fn test_export_rejects_file_destination() {
        let (service, repo, owner, temp) = create_test_service().await;
        let book_id = create_book(&repo, &owner, "Anywhere").await;

        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, b"occupied").unwrap();

        let err = service.export_book_to(&book_id, &blocker).await.unwrap_err();
        assert!(matches!(err, AppError::Export(_)));
    }
}
