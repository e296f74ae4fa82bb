//! SQLite repository backend
//!
//! Persistent [`Repository`] over the pooled connection from
//! [`super::create_pool`]. Entities map to the tables created by
//! `migrations/001_initial_schema.sql`; block payloads, tag lists, and
//! user settings are stored as JSON text columns. Journal mutations run
//! in a transaction whose first statement touches the journals row, so
//! a missing entry fails fast and the write lock is held for the whole
//! read-modify-write. Book deletion cascades through foreign keys.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use super::blocks::{sort_blocks, Block, CreateBlockRequest};
use super::locks::IdLocks;
use super::models::*;
use super::repository::Repository;
use crate::error::{AppError, Result};
use crate::id::{IdGenerator, UuidIdGenerator};
use crate::metrics::compute_metrics;
use crate::stats;

/// SQLite-backed [`Repository`].
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
    ids: Arc<dyn IdGenerator>,
    journal_locks: Arc<IdLocks>,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_id_generator(pool, Arc::new(UuidIdGenerator))
    }

    pub fn with_id_generator(pool: SqlitePool, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            pool,
            ids,
            journal_locks: Arc::new(IdLocks::new()),
        }
    }
}

// ===== Row mapping =====

fn parse_visibility(s: &str) -> Result<Visibility> {
    Visibility::parse(s).ok_or_else(|| AppError::Generic(format!("invalid visibility value: {s}")))
}

fn parse_share_target(s: &str) -> Result<ShareTarget> {
    ShareTarget::parse(s).ok_or_else(|| AppError::Generic(format!("invalid share target: {s}")))
}

fn parse_share_visibility(s: &str) -> Result<ShareVisibility> {
    ShareVisibility::parse(s)
        .ok_or_else(|| AppError::Generic(format!("invalid share visibility: {s}")))
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: Option<String>,
    phone: Option<String>,
    display_name: String,
    avatar_ref: Option<String>,
    settings: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<User> {
        Ok(User {
            id: row.id,
            email: row.email,
            phone: row.phone,
            display_name: row.display_name,
            avatar_ref: row.avatar_ref,
            settings: serde_json::from_str(&row.settings)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id: String,
    owner_id: String,
    title: String,
    description: Option<String>,
    cover_ref: Option<String>,
    default_visibility: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Book> {
        Ok(Book {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            cover_ref: row.cover_ref,
            default_visibility: parse_visibility(&row.default_visibility)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct JournalRow {
    id: String,
    owner_id: String,
    book_id: String,
    title: String,
    visibility: String,
    tags: String,
    word_count: i64,
    image_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JournalRow {
    fn into_entry(self, blocks: Vec<Block>) -> Result<JournalEntry> {
        Ok(JournalEntry {
            id: self.id,
            owner_id: self.owner_id,
            book_id: self.book_id,
            title: self.title,
            visibility: parse_visibility(&self.visibility)?,
            tags: serde_json::from_str(&self.tags)?,
            blocks,
            metrics: MetricsCache {
                word_count: self.word_count as u64,
                image_count: self.image_count as u64,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BlockRow {
    id: String,
    order_index: i64,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BlockRow> for Block {
    type Error = AppError;

    fn try_from(row: BlockRow) -> Result<Block> {
        Ok(Block {
            id: row.id,
            order_index: row.order_index,
            created_at: row.created_at,
            updated_at: row.updated_at,
            content: serde_json::from_str(&row.content)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ShareRow {
    id: String,
    owner_id: String,
    target_type: String,
    target_id: String,
    visibility: String,
    share_token: String,
    created_at: DateTime<Utc>,
    expired_at: Option<DateTime<Utc>>,
}

impl TryFrom<ShareRow> for Share {
    type Error = AppError;

    fn try_from(row: ShareRow) -> Result<Share> {
        Ok(Share {
            id: row.id,
            owner_id: row.owner_id,
            target_type: parse_share_target(&row.target_type)?,
            target_id: row.target_id,
            visibility: parse_share_visibility(&row.visibility)?,
            share_token: row.share_token,
            created_at: row.created_at,
            expired_at: row.expired_at,
        })
    }
}

// ===== Journal helpers =====

/// Blocks of one entry in presentation order. Rowid breaks order-index
/// ties by insertion order, matching the in-memory backend's stable
/// sort.
async fn fetch_blocks(conn: &mut SqliteConnection, journal_id: &str) -> Result<Vec<Block>> {
    let rows = sqlx::query_as::<_, BlockRow>(
        r#"
        SELECT id, order_index, content, created_at, updated_at
        FROM blocks
        WHERE journal_id = ?
        ORDER BY order_index ASC, rowid ASC
        "#,
    )
    .bind(journal_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(Block::try_from).collect()
}

/// Bump the entry's updated timestamp, failing when the id does not
/// resolve. As the first write of every mutation transaction this also
/// acquires the database write lock, so the entry cannot be deleted
/// underneath the rest of the transaction.
async fn touch_journal(
    conn: &mut SqliteConnection,
    journal_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let rows_affected = sqlx::query("UPDATE journals SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(journal_id)
        .execute(conn)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(AppError::JournalNotFound(journal_id.to_string()));
    }
    Ok(())
}

/// Recompute the cached metrics from the persisted blocks and return the
/// updated entry. Runs inside the caller's mutation transaction.
async fn finalize_journal(conn: &mut SqliteConnection, journal_id: &str) -> Result<JournalEntry> {
    let blocks = fetch_blocks(&mut *conn, journal_id).await?;
    let metrics = compute_metrics(&blocks);

    sqlx::query("UPDATE journals SET word_count = ?, image_count = ? WHERE id = ?")
        .bind(metrics.word_count as i64)
        .bind(metrics.image_count as i64)
        .bind(journal_id)
        .execute(&mut *conn)
        .await?;

    let row = sqlx::query_as::<_, JournalRow>("SELECT * FROM journals WHERE id = ?")
        .bind(journal_id)
        .fetch_one(conn)
        .await?;

    row.into_entry(blocks)
}

#[async_trait]
impl Repository for SqliteRepository {
    // ===== Users =====

    async fn create_user(&self, req: CreateUserRequest) -> Result<User> {
        let id = self.ids.generate();
        let now = Utc::now();
        let settings = serde_json::to_string(&req.settings.unwrap_or_default())?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, phone, display_name, avatar_ref, settings, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.email)
        .bind(&req.phone)
        .bind(&req.display_name)
        .bind(&req.avatar_ref)
        .bind(&settings)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created user: {}", id);
        row.try_into()
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))?;

        row.try_into()
    }

    async fn update_user(&self, req: UpdateUserRequest) -> Result<User> {
        let now = Utc::now();

        // Build dynamic update query
        let mut query = "UPDATE users SET updated_at = ?".to_string();
        let mut params: Vec<String> = vec![now.to_rfc3339()];

        if let Some(email) = &req.email {
            query.push_str(", email = ?");
            params.push(email.clone());
        }
        if let Some(phone) = &req.phone {
            query.push_str(", phone = ?");
            params.push(phone.clone());
        }
        if let Some(display_name) = &req.display_name {
            query.push_str(", display_name = ?");
            params.push(display_name.clone());
        }
        if let Some(avatar_ref) = &req.avatar_ref {
            query.push_str(", avatar_ref = ?");
            params.push(avatar_ref.clone());
        }
        if let Some(settings) = &req.settings {
            query.push_str(", settings = ?");
            params.push(serde_json::to_string(settings)?);
        }

        query.push_str(" WHERE id = ?");
        params.push(req.id.clone());

        let mut q = sqlx::query(&query);
        for param in &params {
            q = q.bind(param);
        }

        let rows_affected = q.execute(&self.pool).await?.rows_affected();
        if rows_affected == 0 {
            return Err(AppError::UserNotFound(req.id));
        }

        self.get_user(&req.id).await
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        // Owned books stay behind; book deletion is always explicit.
        let rows_affected = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::UserNotFound(id.to_string()));
        }

        tracing::debug!("Deleted user: {}", id);
        Ok(())
    }

    // ===== Books =====

    async fn create_book(&self, req: CreateBookRequest) -> Result<Book> {
        let id = self.ids.generate();
        let now = Utc::now();

        let default_visibility = match req.default_visibility {
            Some(visibility) => visibility,
            None => {
                let settings: Option<String> =
                    sqlx::query_scalar("SELECT settings FROM users WHERE id = ?")
                        .bind(&req.owner_id)
                        .fetch_optional(&self.pool)
                        .await?;
                match settings {
                    Some(json) => serde_json::from_str::<UserSettings>(&json)?.default_visibility,
                    None => Visibility::default(),
                }
            }
        };

        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (id, owner_id, title, description, cover_ref, default_visibility, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.owner_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.cover_ref)
        .bind(default_visibility.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created book: {}", id);
        row.try_into()
    }

    async fn get_book(&self, id: &str) -> Result<Book> {
        let row = sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::BookNotFound(id.to_string()))?;

        row.try_into()
    }

    async fn get_books_by_owner(&self, owner_id: &str) -> Result<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT * FROM books
            WHERE owner_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    async fn update_book(&self, req: UpdateBookRequest) -> Result<Book> {
        let now = Utc::now();

        // Build dynamic update query
        let mut query = "UPDATE books SET updated_at = ?".to_string();
        let mut params: Vec<String> = vec![now.to_rfc3339()];

        if let Some(title) = &req.title {
            query.push_str(", title = ?");
            params.push(title.clone());
        }
        if let Some(description) = &req.description {
            query.push_str(", description = ?");
            params.push(description.clone());
        }
        if let Some(cover_ref) = &req.cover_ref {
            query.push_str(", cover_ref = ?");
            params.push(cover_ref.clone());
        }
        if let Some(default_visibility) = req.default_visibility {
            query.push_str(", default_visibility = ?");
            params.push(default_visibility.as_str().to_string());
        }

        query.push_str(" WHERE id = ?");
        params.push(req.id.clone());

        let mut q = sqlx::query(&query);
        for param in &params {
            q = q.bind(param);
        }

        let rows_affected = q.execute(&self.pool).await?.rows_affected();
        if rows_affected == 0 {
            return Err(AppError::BookNotFound(req.id));
        }

        self.get_book(&req.id).await
    }

    async fn delete_book(&self, id: &str) -> Result<()> {
        // Journals (and their blocks) go with the book via ON DELETE CASCADE.
        let rows_affected = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::BookNotFound(id.to_string()));
        }

        tracing::debug!("Deleted book: {}", id);
        Ok(())
    }

    // ===== Journal entries =====

    async fn create_journal(&self, req: CreateJournalRequest) -> Result<JournalEntry> {
        let id = self.ids.generate();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let book_visibility: Option<String> =
            sqlx::query_scalar("SELECT default_visibility FROM books WHERE id = ?")
                .bind(&req.book_id)
                .fetch_optional(&mut *tx)
                .await?;
        let book_visibility = book_visibility
            .ok_or_else(|| AppError::BookNotFound(req.book_id.clone()))?;
        let visibility = match req.visibility {
            Some(visibility) => visibility,
            None => parse_visibility(&book_visibility)?,
        };

        let mut blocks: Vec<Block> = req
            .blocks
            .into_iter()
            .map(|b| Block {
                id: self.ids.generate(),
                order_index: b.order_index,
                created_at: now,
                updated_at: now,
                content: b.content,
            })
            .collect();
        sort_blocks(&mut blocks);
        let metrics = compute_metrics(&blocks);

        let row = sqlx::query_as::<_, JournalRow>(
            r#"
            INSERT INTO journals (id, owner_id, book_id, title, visibility, tags, word_count, image_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.owner_id)
        .bind(&req.book_id)
        .bind(&req.title)
        .bind(visibility.as_str())
        .bind(serde_json::to_string(&req.tags)?)
        .bind(metrics.word_count as i64)
        .bind(metrics.image_count as i64)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for block in &blocks {
            sqlx::query(
                r#"
                INSERT INTO blocks (id, journal_id, order_index, content, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&block.id)
            .bind(&id)
            .bind(block.order_index)
            .bind(serde_json::to_string(&block.content)?)
            .bind(block.created_at)
            .bind(block.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!("Created journal: {}", id);
        row.into_entry(blocks)
    }

    async fn get_journal(&self, id: &str) -> Result<JournalEntry> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, JournalRow>("SELECT * FROM journals WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::JournalNotFound(id.to_string()))?;

        let blocks = fetch_blocks(&mut conn, id).await?;
        row.into_entry(blocks)
    }

    async fn get_journals_by_book(&self, book_id: &str) -> Result<Vec<JournalEntry>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, JournalRow>(
            r#"
            SELECT * FROM journals
            WHERE book_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(book_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let blocks = fetch_blocks(&mut conn, &row.id).await?;
            entries.push(row.into_entry(blocks)?);
        }
        Ok(entries)
    }

    async fn get_journals_by_owner(&self, owner_id: &str) -> Result<Vec<JournalEntry>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, JournalRow>(
            r#"
            SELECT * FROM journals
            WHERE owner_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let blocks = fetch_blocks(&mut conn, &row.id).await?;
            entries.push(row.into_entry(blocks)?);
        }
        Ok(entries)
    }

    async fn update_journal(&self, req: UpdateJournalRequest) -> Result<JournalEntry> {
        let _guard = self.journal_locks.acquire(&req.id).await;
        let now = Utc::now();

        // Build dynamic update query
        let mut query = "UPDATE journals SET updated_at = ?".to_string();
        let mut params: Vec<String> = vec![now.to_rfc3339()];

        if let Some(title) = &req.title {
            query.push_str(", title = ?");
            params.push(title.clone());
        }
        if let Some(visibility) = req.visibility {
            query.push_str(", visibility = ?");
            params.push(visibility.as_str().to_string());
        }
        if let Some(tags) = &req.tags {
            query.push_str(", tags = ?");
            params.push(serde_json::to_string(tags)?);
        }

        query.push_str(" WHERE id = ?");
        params.push(req.id.clone());

        let mut q = sqlx::query(&query);
        for param in &params {
            q = q.bind(param);
        }

        let rows_affected = q.execute(&self.pool).await?.rows_affected();
        if rows_affected == 0 {
            return Err(AppError::JournalNotFound(req.id));
        }

        self.get_journal(&req.id).await
    }

    async fn delete_journal(&self, id: &str) -> Result<()> {
        let _guard = self.journal_locks.acquire(id).await;

        // Blocks go with the journal via ON DELETE CASCADE.
        let rows_affected = sqlx::query("DELETE FROM journals WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::JournalNotFound(id.to_string()));
        }

        tracing::debug!("Deleted journal: {}", id);
        Ok(())
    }

    // ===== Blocks =====

    async fn add_block_to_journal(
        &self,
        journal_id: &str,
        req: CreateBlockRequest,
    ) -> Result<JournalEntry> {
        let _guard = self.journal_locks.acquire(journal_id).await;
        let block_id = self.ids.generate();
        let now = Utc::now();
        let content = serde_json::to_string(&req.content)?;

        let mut tx = self.pool.begin().await?;
        touch_journal(&mut tx, journal_id, now).await?;

        sqlx::query(
            r#"
            INSERT INTO blocks (id, journal_id, order_index, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&block_id)
        .bind(journal_id)
        .bind(req.order_index)
        .bind(&content)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let entry = finalize_journal(&mut tx, journal_id).await?;
        tx.commit().await?;

        tracing::debug!("Added block {} to journal: {}", block_id, journal_id);
        Ok(entry)
    }

    async fn update_block_in_journal(
        &self,
        journal_id: &str,
        block: Block,
    ) -> Result<JournalEntry> {
        let _guard = self.journal_locks.acquire(journal_id).await;
        let now = Utc::now();
        let content = serde_json::to_string(&block.content)?;

        let mut tx = self.pool.begin().await?;
        touch_journal(&mut tx, journal_id, now).await?;

        // Unknown block ids are a silent no-op.
        sqlx::query(
            r#"
            UPDATE blocks SET order_index = ?, content = ?, updated_at = ?
            WHERE id = ? AND journal_id = ?
            "#,
        )
        .bind(block.order_index)
        .bind(&content)
        .bind(now)
        .bind(&block.id)
        .bind(journal_id)
        .execute(&mut *tx)
        .await?;

        let entry = finalize_journal(&mut tx, journal_id).await?;
        tx.commit().await?;

        Ok(entry)
    }

    async fn remove_block_from_journal(
        &self,
        journal_id: &str,
        block_id: &str,
    ) -> Result<JournalEntry> {
        let _guard = self.journal_locks.acquire(journal_id).await;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        touch_journal(&mut tx, journal_id, now).await?;

        // Removing an absent id is a no-op, which makes the call idempotent.
        sqlx::query("DELETE FROM blocks WHERE id = ? AND journal_id = ?")
            .bind(block_id)
            .bind(journal_id)
            .execute(&mut *tx)
            .await?;

        let entry = finalize_journal(&mut tx, journal_id).await?;
        tx.commit().await?;

        Ok(entry)
    }

    // ===== Shares =====

    async fn create_share(&self, req: CreateShareRequest) -> Result<Share> {
        let id = self.ids.generate();
        let now = Utc::now();

        // The unique index on share_token rejects duplicate tokens.
        let row = sqlx::query_as::<_, ShareRow>(
            r#"
            INSERT INTO shares (id, owner_id, target_type, target_id, visibility, share_token, created_at, expired_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.owner_id)
        .bind(req.target_type.as_str())
        .bind(&req.target_id)
        .bind(req.visibility.as_str())
        .bind(&req.share_token)
        .bind(now)
        .bind(req.expired_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created share: {}", id);
        row.try_into()
    }

    async fn get_share_by_token(&self, token: &str) -> Result<Share> {
        let row = sqlx::query_as::<_, ShareRow>("SELECT * FROM shares WHERE share_token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::ShareNotFound(token.to_string()))?;

        row.try_into()
    }

    async fn get_shares_by_owner(&self, owner_id: &str) -> Result<Vec<Share>> {
        let rows = sqlx::query_as::<_, ShareRow>(
            r#"
            SELECT * FROM shares
            WHERE owner_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Share::try_from).collect()
    }

    async fn delete_share(&self, id: &str) -> Result<()> {
        let rows_affected = sqlx::query("DELETE FROM shares WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::ShareNotFound(id.to_string()));
        }

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
        // Window filtering happens on the decoded timestamps so the date
        // semantics cannot drift from the in-memory backend.
        let mut entries = self.get_journals_by_owner(owner_id).await?;
        entries.retain(|e| stats::in_date_range(e, start, end));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::blocks::BlockContent;
    use crate::database::schema::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_repo() -> SqliteRepository {
        // One connection only: every pooled connection to sqlite::memory:
        // would otherwise open its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();
        SqliteRepository::new(pool)
    }

    async fn seeded_repo() -> (SqliteRepository, User, Book) {
        let repo = test_repo().await;
        let user = repo
            .create_user(CreateUserRequest {
                email: Some("ada@example.com".into()),
                phone: None,
                display_name: "Ada".into(),
                avatar_ref: None,
                settings: None,
            })
            .await
            .unwrap();
        let book = repo
            .create_book(CreateBookRequest {
                owner_id: user.id.clone(),
                title: "Field notes".into(),
                description: None,
                cover_ref: None,
                default_visibility: None,
            })
            .await
            .unwrap();
        (repo, user, book)
    }

    #[tokio::test]
    async fn test_user_round_trip_preserves_settings() {
        let repo = test_repo().await;
        let settings = UserSettings {
            locale: "de-DE".into(),
            theme: "dark".into(),
            default_visibility: Visibility::Public,
        };
        let created = repo
            .create_user(CreateUserRequest {
                email: None,
                phone: Some("+49123".into()),
                display_name: "Kurt".into(),
                avatar_ref: None,
                settings: Some(settings.clone()),
            })
            .await
            .unwrap();

        let loaded = repo.get_user(&created.id).await.unwrap();
        assert_eq!(loaded.settings, settings);
        assert_eq!(loaded.phone.as_deref(), Some("+49123"));
    }

    #[tokio::test]
    async fn test_create_journal_with_initial_blocks() {
        let (repo, user, book) = seeded_repo().await;

        let entry = repo
            .create_journal(CreateJournalRequest {
                owner_id: user.id.clone(),
                book_id: book.id.clone(),
                title: "Day one".into(),
                visibility: None,
                tags: vec!["travel".into()],
                blocks: vec![
                    CreateBlockRequest {
                        order_index: 1,
                        content: BlockContent::image("hash-a"),
                    },
                    CreateBlockRequest {
                        order_index: 0,
                        content: BlockContent::text("hello world"),
                    },
                ],
            })
            .await
            .unwrap();

        assert_eq!(entry.metrics, MetricsCache { word_count: 2, image_count: 1 });
        assert_eq!(entry.blocks[0].order_index, 0);

        let loaded = repo.get_journal(&entry.id).await.unwrap();
        assert_eq!(loaded.blocks.len(), 2);
        assert_eq!(loaded.metrics, entry.metrics);
        assert_eq!(loaded.tags, vec!["travel".to_string()]);
    }

    #[tokio::test]
    async fn test_block_mutations_update_persisted_metrics() {
        let (repo, user, book) = seeded_repo().await;
        let entry = repo
            .create_journal(CreateJournalRequest {
                owner_id: user.id.clone(),
                book_id: book.id.clone(),
                title: "Day one".into(),
                visibility: None,
                tags: Vec::new(),
                blocks: Vec::new(),
            })
            .await
            .unwrap();

        let entry = repo
            .add_block_to_journal(
                &entry.id,
                CreateBlockRequest {
                    order_index: 0,
                    content: BlockContent::text("one two three"),
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.metrics.word_count, 3);

        let block_id = entry.blocks[0].id.clone();
        let entry = repo
            .remove_block_from_journal(&entry.id, &block_id)
            .await
            .unwrap();
        assert_eq!(entry.metrics, MetricsCache::default());

        // The cache survives a reload, it is not recomputed on read.
        let word_count: i64 = sqlx::query_scalar("SELECT word_count FROM journals WHERE id = ?")
            .bind(&entry.id)
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(word_count, 0);
    }

    #[tokio::test]
    async fn test_add_block_to_missing_journal_fails() {
        let (repo, _, _) = seeded_repo().await;
        let err = repo
            .add_block_to_journal(
                "missing",
                CreateBlockRequest {
                    order_index: 0,
                    content: BlockContent::text("x"),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_book_cascades_through_foreign_keys() {
        let (repo, user, book) = seeded_repo().await;
        let entry = repo
            .create_journal(CreateJournalRequest {
                owner_id: user.id.clone(),
                book_id: book.id.clone(),
                title: "Day one".into(),
                visibility: None,
                tags: Vec::new(),
                blocks: vec![CreateBlockRequest {
                    order_index: 0,
                    content: BlockContent::text("hello"),
                }],
            })
            .await
            .unwrap();

        repo.delete_book(&book.id).await.unwrap();

        assert!(repo.get_journal(&entry.id).await.unwrap_err().is_not_found());
        let orphan_blocks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(orphan_blocks, 0);
    }

    #[tokio::test]
    async fn test_share_round_trip() {
        let (repo, user, book) = seeded_repo().await;
        let share = repo
            .create_share(CreateShareRequest {
                owner_id: user.id.clone(),
                target_type: ShareTarget::Book,
                target_id: book.id.clone(),
                visibility: ShareVisibility::PublicLink,
                share_token: "tok-abc".into(),
                expired_at: None,
            })
            .await
            .unwrap();

        let resolved = repo.get_share_by_token("tok-abc").await.unwrap();
        assert_eq!(resolved.id, share.id);
        assert_eq!(resolved.target_type, ShareTarget::Book);

        repo.delete_share(&share.id).await.unwrap();
        assert!(repo
            .get_share_by_token("tok-abc")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_share_token_violates_unique_index() {
        let (repo, user, book) = seeded_repo().await;
        let req = CreateShareRequest {
            owner_id: user.id.clone(),
            target_type: ShareTarget::JournalEntry,
            target_id: book.id.clone(),
            visibility: ShareVisibility::PublicLink,
            share_token: "tok-dup".into(),
            expired_at: None,
        };

        repo.create_share(req.clone()).await.unwrap();
        let err = repo.create_share(req).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
