//! In-memory repository backend
//!
//! HashMap-per-entity storage behind an async read/write lock, used by
//! tests and ephemeral sessions. Journal mutations additionally hold the
//! entry's write lock from [`super::locks::IdLocks`] so a concurrent
//! read-modify-write on the same entry cannot drop the other call's
//! changes, while work on different entries proceeds in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use super::blocks::{sort_blocks, Block, CreateBlockRequest};
use super::locks::IdLocks;
use super::models::*;
use super::repository::Repository;
use crate::error::{AppError, Result};
use crate::id::{IdGenerator, UuidIdGenerator};
use crate::metrics::compute_metrics;
use crate::stats;

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    books: HashMap<String, Book>,
    journals: HashMap<String, JournalEntry>,
    shares: HashMap<String, Share>,
}

struct Inner {
    state: RwLock<MemoryState>,
    journal_locks: IdLocks,
    ids: Arc<dyn IdGenerator>,
}

/// Map-backed [`Repository`].
#[derive(Clone)]
pub struct MemoryRepository {
    inner: Arc<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(UuidIdGenerator))
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(MemoryState::default()),
                journal_locks: IdLocks::new(),
                ids,
            }),
        }
    }

    fn mint_block(&self, req: CreateBlockRequest) -> Block {
        let now = Utc::now();
        Block {
            id: self.inner.ids.generate(),
            order_index: req.order_index,
            created_at: now,
            updated_at: now,
            content: req.content,
        }
    }

    /// Read-modify-write one entry under its per-id lock.
    ///
    /// The snapshot is cloned out of the map, mutated, normalized (block
    /// order, metrics cache, updated timestamp), and written back. The
    /// write-back re-checks existence so an entry removed by a racing
    /// cascade delete is not resurrected.
    async fn mutate_journal<F>(&self, journal_id: &str, mutate: F) -> Result<JournalEntry>
    where
        F: FnOnce(&mut JournalEntry),
    {
        let _guard = self.inner.journal_locks.acquire(journal_id).await;

        let mut entry = {
            let state = self.inner.state.read().await;
            state
                .journals
                .get(journal_id)
                .cloned()
                .ok_or_else(|| AppError::JournalNotFound(journal_id.to_string()))?
        };

        mutate(&mut entry);
        sort_blocks(&mut entry.blocks);
        entry.metrics = compute_metrics(&entry.blocks);
        entry.updated_at = Utc::now();

        let mut state = self.inner.state.write().await;
        if !state.journals.contains_key(journal_id) {
            return Err(AppError::JournalNotFound(journal_id.to_string()));
        }
        state.journals.insert(journal_id.to_string(), entry.clone());
        Ok(entry)
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // ===== Users =====

    async fn create_user(&self, req: CreateUserRequest) -> Result<User> {
        let now = Utc::now();
        let id = self.inner.ids.generate();
        let user = User {
            id: id.clone(),
            email: req.email,
            phone: req.phone,
            display_name: req.display_name,
            avatar_ref: req.avatar_ref,
            settings: req.settings.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.inner.state.write().await;
        state.users.insert(id.clone(), user.clone());

        tracing::debug!("Created user: {}", id);
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        let state = self.inner.state.read().await;
        state
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    async fn update_user(&self, req: UpdateUserRequest) -> Result<User> {
        let mut state = self.inner.state.write().await;
        let user = state
            .users
            .get_mut(&req.id)
            .ok_or_else(|| AppError::UserNotFound(req.id.clone()))?;

        if let Some(email) = req.email {
            user.email = Some(email);
        }
        if let Some(phone) = req.phone {
            user.phone = Some(phone);
        }
        if let Some(display_name) = req.display_name {
            user.display_name = display_name;
        }
        if let Some(avatar_ref) = req.avatar_ref {
            user.avatar_ref = Some(avatar_ref);
        }
        if let Some(settings) = req.settings {
            user.settings = settings;
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        let mut state = self.inner.state.write().await;
        state
            .users
            .remove(id)
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))?;
        // Owned books stay behind; book deletion is always explicit.
        tracing::debug!("Deleted user: {}", id);
        Ok(())
    }

    // ===== Books =====

    async fn create_book(&self, req: CreateBookRequest) -> Result<Book> {
        let now = Utc::now();
        let id = self.inner.ids.generate();

        let mut state = self.inner.state.write().await;
        let default_visibility = req.default_visibility.unwrap_or_else(|| {
            state
                .users
                .get(&req.owner_id)
                .map(|u| u.settings.default_visibility)
                .unwrap_or_default()
        });

        let book = Book {
            id: id.clone(),
            owner_id: req.owner_id,
            title: req.title,
            description: req.description,
            cover_ref: req.cover_ref,
            default_visibility,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(id.clone(), book.clone());

        tracing::debug!("Created book: {}", id);
        Ok(book)
    }

    async fn get_book(&self, id: &str) -> Result<Book> {
        let state = self.inner.state.read().await;
        state
            .books
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::BookNotFound(id.to_string()))
    }

    async fn get_books_by_owner(&self, owner_id: &str) -> Result<Vec<Book>> {
        let state = self.inner.state.read().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| b.owner_id == owner_id)
            .cloned()
            .collect();
        books.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn update_book(&self, req: UpdateBookRequest) -> Result<Book> {
        let mut state = self.inner.state.write().await;
        let book = state
            .books
            .get_mut(&req.id)
            .ok_or_else(|| AppError::BookNotFound(req.id.clone()))?;

        if let Some(title) = req.title {
            book.title = title;
        }
        if let Some(description) = req.description {
            book.description = Some(description);
        }
        if let Some(cover_ref) = req.cover_ref {
            book.cover_ref = Some(cover_ref);
        }
        if let Some(default_visibility) = req.default_visibility {
            book.default_visibility = default_visibility;
        }
        book.updated_at = Utc::now();

        Ok(book.clone())
    }

    async fn delete_book(&self, id: &str) -> Result<()> {
        let mut state = self.inner.state.write().await;
        state
            .books
            .remove(id)
            .ok_or_else(|| AppError::BookNotFound(id.to_string()))?;

        let before = state.journals.len();
        state.journals.retain(|_, entry| entry.book_id != id);
        let cascaded = before - state.journals.len();

        tracing::debug!("Deleted book: {} ({} journals cascaded)", id, cascaded);
        Ok(())
    }

    // ===== Journal entries =====

    async fn create_journal(&self, req: CreateJournalRequest) -> Result<JournalEntry> {
        let now = Utc::now();
        let id = self.inner.ids.generate();

        let mut state = self.inner.state.write().await;
        let book = state
            .books
            .get(&req.book_id)
            .ok_or_else(|| AppError::BookNotFound(req.book_id.clone()))?;
        let visibility = req.visibility.unwrap_or(book.default_visibility);

        let mut blocks: Vec<Block> = req.blocks.into_iter().map(|b| self.mint_block(b)).collect();
        sort_blocks(&mut blocks);
        let metrics = compute_metrics(&blocks);

        let entry = JournalEntry {
            id: id.clone(),
            owner_id: req.owner_id,
            book_id: req.book_id,
            title: req.title,
            visibility,
            tags: req.tags,
            blocks,
            metrics,
            created_at: now,
            updated_at: now,
        };
        state.journals.insert(id.clone(), entry.clone());

        tracing::debug!("Created journal: {}", id);
        Ok(entry)
    }

    async fn get_journal(&self, id: &str) -> Result<JournalEntry> {
        let state = self.inner.state.read().await;
        state
            .journals
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::JournalNotFound(id.to_string()))
    }

    async fn get_journals_by_book(&self, book_id: &str) -> Result<Vec<JournalEntry>> {
        let state = self.inner.state.read().await;
        let mut entries: Vec<JournalEntry> = state
            .journals
            .values()
            .filter(|e| e.book_id == book_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn get_journals_by_owner(&self, owner_id: &str) -> Result<Vec<JournalEntry>> {
        let state = self.inner.state.read().await;
        let mut entries: Vec<JournalEntry> = state
            .journals
            .values()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn update_journal(&self, req: UpdateJournalRequest) -> Result<JournalEntry> {
        let journal_id = req.id.clone();
        self.mutate_journal(&journal_id, |entry| {
            if let Some(title) = req.title {
                entry.title = title;
            }
            if let Some(visibility) = req.visibility {
                entry.visibility = visibility;
            }
            if let Some(tags) = req.tags {
                entry.tags = tags;
            }
        })
        .await
    }

    async fn delete_journal(&self, id: &str) -> Result<()> {
        let _guard = self.inner.journal_locks.acquire(id).await;
        let mut state = self.inner.state.write().await;
        state
            .journals
            .remove(id)
            .ok_or_else(|| AppError::JournalNotFound(id.to_string()))?;

        tracing::debug!("Deleted journal: {}", id);
        Ok(())
    }

    // ===== Blocks =====

    async fn add_block_to_journal(
        &self,
        journal_id: &str,
        req: CreateBlockRequest,
    ) -> Result<JournalEntry> {
        let block = self.mint_block(req);
        let entry = self
            .mutate_journal(journal_id, |entry| entry.blocks.push(block))
            .await?;

        tracing::debug!("Added block to journal: {}", journal_id);
        Ok(entry)
    }

    async fn update_block_in_journal(
        &self,
        journal_id: &str,
        block: Block,
    ) -> Result<JournalEntry> {
        self.mutate_journal(journal_id, |entry| {
            // Unknown block ids are a silent no-op.
            if let Some(existing) = entry.blocks.iter_mut().find(|b| b.id == block.id) {
                existing.content = block.content;
                existing.order_index = block.order_index;
                existing.updated_at = Utc::now();
            }
        })
        .await
    }

    async fn remove_block_from_journal(
        &self,
        journal_id: &str,
        block_id: &str,
    ) -> Result<JournalEntry> {
        self.mutate_journal(journal_id, |entry| {
            entry.blocks.retain(|b| b.id != block_id);
        })
        .await
    }

    // ===== Shares =====

    async fn create_share(&self, req: CreateShareRequest) -> Result<Share> {
        let now = Utc::now();
        let id = self.inner.ids.generate();

        let mut state = self.inner.state.write().await;
        // Mirrors the unique index the persistent backend puts on tokens.
        if state.shares.values().any(|s| s.share_token == req.share_token) {
            return Err(AppError::Generic(format!(
                "share token already in use: {}",
                req.share_token
            )));
        }

        let share = Share {
            id: id.clone(),
            owner_id: req.owner_id,
            target_type: req.target_type,
            target_id: req.target_id,
            visibility: req.visibility,
            share_token: req.share_token,
            created_at: now,
            expired_at: req.expired_at,
        };
        state.shares.insert(id.clone(), share.clone());

        tracing::debug!("Created share: {}", id);
        Ok(share)
    }

    async fn get_share_by_token(&self, token: &str) -> Result<Share> {
        let state = self.inner.state.read().await;
        state
            .shares
            .values()
            .find(|s| s.share_token == token)
            .cloned()
            .ok_or_else(|| AppError::ShareNotFound(token.to_string()))
    }

    async fn get_shares_by_owner(&self, owner_id: &str) -> Result<Vec<Share>> {
        let state = self.inner.state.read().await;
        let mut shares: Vec<Share> = state
            .shares
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        shares.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(shares)
    }

    async fn delete_share(&self, id: &str) -> Result<()> {
        let mut state = self.inner.state.write().await;
        state
            .shares
            .remove(id)
            .ok_or_else(|| AppError::ShareNotFound(id.to_string()))?;

        tracing::debug!("Deleted share: {}", id);
        Ok(())
    }

    // ===== Statistics reads =====

    async fn get_journals_by_owner_in_range(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<JournalEntry>> {
        let mut entries = self.get_journals_by_owner(owner_id).await?;
        entries.retain(|e| stats::in_date_range(e, start, end));
        Ok(entries)
    }
}
