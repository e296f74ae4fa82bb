//! Repository contract
//!
//! The mutation and query boundary for users, books, journal entries,
//! blocks, and shares. Implementations must keep the metrics cache in
//! step with block mutations, cascade book deletion onto the book's
//! entries, and serialize mutations per entry id (see
//! [`crate::database::locks`]). Statistics reads are derived here from
//! the windowed entry fetch so every backend aggregates identically.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::blocks::{Block, CreateBlockRequest};
use super::models::*;
use crate::error::Result;
use crate::stats;

/// Storage backend contract for all aggregate operations.
///
/// Every method may suspend; mutations are all-or-nothing per call. Two
/// implementations are provided: [`super::memory::MemoryRepository`]
/// for tests and [`super::sqlite::SqliteRepository`] for production.
#[async_trait]
pub trait Repository: Send + Sync {
    // ===== Users =====

    async fn create_user(&self, req: CreateUserRequest) -> Result<User>;
    async fn get_user(&self, id: &str) -> Result<User>;
    async fn update_user(&self, req: UpdateUserRequest) -> Result<User>;
    /// Delete a user. Books owned by the user are kept; book deletion is
    /// always an explicit call.
    async fn delete_user(&self, id: &str) -> Result<()>;

    // ===== Books =====

    /// Create a book. When the request carries no default visibility the
    /// owner's settings decide; a missing owner falls back to private.
    async fn create_book(&self, req: CreateBookRequest) -> Result<Book>;
    async fn get_book(&self, id: &str) -> Result<Book>;
    async fn get_books_by_owner(&self, owner_id: &str) -> Result<Vec<Book>>;
    async fn update_book(&self, req: UpdateBookRequest) -> Result<Book>;
    /// Delete a book and every journal entry referencing it. After this
    /// returns no entry with this book id is retrievable by any query.
    async fn delete_book(&self, id: &str) -> Result<()>;

    // ===== Journal entries =====

    /// Create an entry in an existing book. Fails with `BookNotFound`
    /// when the book id does not resolve; inherits the book's default
    /// visibility when the request leaves it unset. Initial blocks get
    /// ids and timestamps here and the metrics cache is computed from
    /// them before the entry is persisted.
    async fn create_journal(&self, req: CreateJournalRequest) -> Result<JournalEntry>;
    async fn get_journal(&self, id: &str) -> Result<JournalEntry>;
    /// Entries for one book, oldest first (creation time, then id).
    async fn get_journals_by_book(&self, book_id: &str) -> Result<Vec<JournalEntry>>;
    /// Entries for one owner across all books, oldest first.
    async fn get_journals_by_owner(&self, owner_id: &str) -> Result<Vec<JournalEntry>>;
    async fn update_journal(&self, req: UpdateJournalRequest) -> Result<JournalEntry>;
    async fn delete_journal(&self, id: &str) -> Result<()>;

    // ===== Blocks =====

    /// Append a block to an entry, then re-sort the sequence by order
    /// index, recompute the metrics cache, and bump the entry's updated
    /// timestamp. Returns the updated entry. Fails with
    /// `JournalNotFound` when the entry id does not resolve.
    async fn add_block_to_journal(
        &self,
        journal_id: &str,
        req: CreateBlockRequest,
    ) -> Result<JournalEntry>;

    /// Replace the payload and order index of the block whose id matches
    /// `block.id`. A block id with no match inside the entry is a silent
    /// no-op; the entry itself must exist. Metrics and timestamps are
    /// refreshed exactly as in [`Self::add_block_to_journal`].
    async fn update_block_in_journal(&self, journal_id: &str, block: Block)
        -> Result<JournalEntry>;

    /// Remove the block with the given id. Removing an absent id is a
    /// no-op, so the call is idempotent. Metrics and timestamps are
    /// refreshed as in [`Self::add_block_to_journal`].
    async fn remove_block_from_journal(
        &self,
        journal_id: &str,
        block_id: &str,
    ) -> Result<JournalEntry>;

    // ===== Shares =====

    async fn create_share(&self, req: CreateShareRequest) -> Result<Share>;
    /// Resolve a share by its token. Expired-at is advisory metadata and
    /// is not checked here.
    async fn get_share_by_token(&self, token: &str) -> Result<Share>;
    async fn get_shares_by_owner(&self, owner_id: &str) -> Result<Vec<Share>>;
    async fn delete_share(&self, id: &str) -> Result<()>;

    // ===== Statistics reads =====

    /// Entries for one owner whose creation date (UTC calendar date)
    /// falls inside the inclusive `[start, end]` window, oldest first.
    /// The aggregations below derive from this fetch.
    async fn get_journals_by_owner_in_range(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<JournalEntry>>;

    /// Entries-per-day histogram over the window.
    async fn get_writing_frequency(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, u64>> {
        let entries = self.get_journals_by_owner_in_range(owner_id, start, end).await?;
        Ok(stats::writing_frequency(&entries))
    }

    /// Total cached word count over the window.
    async fn get_word_count_stats(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64> {
        let entries = self.get_journals_by_owner_in_range(owner_id, start, end).await?;
        Ok(stats::word_count_total(&entries))
    }

    /// Total cached image count over the window.
    async fn get_image_count_stats(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64> {
        let entries = self.get_journals_by_owner_in_range(owner_id, start, end).await?;
        Ok(stats::image_count_total(&entries))
    }

    /// Tag occurrence counts over the window.
    async fn get_tag_distribution(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, u64>> {
        let entries = self.get_journals_by_owner_in_range(owner_id, start, end).await?;
        Ok(stats::tag_distribution(&entries))
    }
}
