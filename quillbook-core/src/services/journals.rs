//! Journals service
//!
//! High-level operations over books, journal entries, and their blocks.
//! Thin coordination over the repository; invariants (metrics cache,
//! cascade deletes, block ordering) live in the repository itself.

use std::sync::Arc;

use crate::database::{
    Block, Book, CreateBlockRequest, CreateBookRequest, CreateJournalRequest, JournalEntry,
    Repository, UpdateBookRequest, UpdateJournalRequest,
};
use crate::error::Result;

/// Service for managing books and journal entries
#[derive(Clone)]
pub struct JournalsService {
    repo: Arc<dyn Repository>,
}

impl JournalsService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    // ===== Books =====

    /// Create a new book
    pub async fn create_book(&self, req: CreateBookRequest) -> Result<Book> {
        tracing::info!("Creating book: {}", req.title);

        let book = self.repo.create_book(req).await?;

        tracing::info!("Book created successfully: {}", book.id);
        Ok(book)
    }

    /// Get a book by ID
    pub async fn get_book(&self, id: &str) -> Result<Book> {
        self.repo.get_book(id).await
    }

    /// List a user's books
    pub async fn list_books(&self, owner_id: &str) -> Result<Vec<Book>> {
        self.repo.get_books_by_owner(owner_id).await
    }

    /// Update a book
    pub async fn update_book(&self, req: UpdateBookRequest) -> Result<Book> {
        tracing::debug!("Updating book: {}", req.id);
        self.repo.update_book(req).await
    }

    /// Delete a book and every journal entry it contains
    pub async fn delete_book(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting book: {}", id);

        self.repo.delete_book(id).await?;

        tracing::info!("Book deleted successfully: {}", id);
        Ok(())
    }

    // ===== Journal entries =====

    /// Create a new journal entry
    pub async fn create_journal(&self, req: CreateJournalRequest) -> Result<JournalEntry> {
        tracing::info!("Creating journal entry: {}", req.title);

        let entry = self.repo.create_journal(req).await?;

        tracing::info!("Journal entry created successfully: {}", entry.id);
        Ok(entry)
    }

    /// Get a journal entry by ID
    pub async fn get_journal(&self, id: &str) -> Result<JournalEntry> {
        self.repo.get_journal(id).await
    }

    /// List a book's entries in chronological order
    pub async fn list_journals_by_book(&self, book_id: &str) -> Result<Vec<JournalEntry>> {
        self.repo.get_journals_by_book(book_id).await
    }

    /// List a user's entries across all books in chronological order
    pub async fn list_journals_by_owner(&self, owner_id: &str) -> Result<Vec<JournalEntry>> {
        self.repo.get_journals_by_owner(owner_id).await
    }

    /// Update a journal entry's title, visibility, or tag list
    pub async fn update_journal(&self, req: UpdateJournalRequest) -> Result<JournalEntry> {
        tracing::debug!("Updating journal entry: {}", req.id);
        self.repo.update_journal(req).await
    }

    /// Delete a journal entry
    pub async fn delete_journal(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting journal entry: {}", id);

        self.repo.delete_journal(id).await?;

        tracing::info!("Journal entry deleted successfully: {}", id);
        Ok(())
    }

    // ===== Blocks =====

    /// Append a block to an entry
    pub async fn add_block(&self, journal_id: &str, req: CreateBlockRequest) -> Result<JournalEntry> {
        tracing::debug!("Adding block to journal entry: {}", journal_id);
        self.repo.add_block_to_journal(journal_id, req).await
    }

    /// Replace a block's payload and position
    pub async fn update_block(&self, journal_id: &str, block: Block) -> Result<JournalEntry> {
        tracing::debug!("Updating block {} in journal entry: {}", block.id, journal_id);
        self.repo.update_block_in_journal(journal_id, block).await
    }

    /// Remove a block from an entry
    pub async fn remove_block(&self, journal_id: &str, block_id: &str) -> Result<JournalEntry> {
        tracing::debug!("Removing block {} from journal entry: {}", block_id, journal_id);
        self.repo.remove_block_from_journal(journal_id, block_id).await
    }
}
