//! Database models
//!
//! Rust structs representing the journaling entities.
//! All models use serde for serialization to view-model layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::blocks::{sort_blocks, Block, CreateBlockRequest};

/// Who may see a book or journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PUBLIC" => Some(Visibility::Public),
            "PRIVATE" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Per-user preferences carried on the account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub locale: String,
    pub theme: String,
    pub default_visibility: Visibility,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            theme: "system".to_string(),
            default_visibility: Visibility::Private,
        }
    }
}

/// An account. Deleting a user never cascades onto owned content;
/// orphaned books are permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub display_name: String,
    /// Media-store hash of the avatar image, if any
    pub avatar_ref: Option<String>,
    pub settings: UserSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A collection of journal entries. Entries reference their book by id;
/// the book does not embed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Media-store hash of the cover image, if any
    pub cover_ref: Option<String>,
    pub default_visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived word/image counts for a journal entry.
///
/// Always equals the metrics calculator's output over the entry's current
/// blocks; every block mutation recomputes it before persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MetricsCache {
    pub word_count: u64,
    pub image_count: u64,
}

/// One journal document: an ordered block sequence plus cached metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub owner_id: String,
    pub book_id: String,
    pub title: String,
    pub visibility: Visibility,
    /// Unordered labels; duplicates are preserved as stored
    pub tags: Vec<String>,
    /// Kept ascending by `order_index` by the repository
    pub blocks: Vec<Block>,
    pub metrics: MetricsCache,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Blocks in stable render order (ascending `order_index`).
    pub fn sorted_blocks(&self) -> Vec<Block> {
        let mut blocks = self.blocks.clone();
        sort_blocks(&mut blocks);
        blocks
    }
}

/// What a share token points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareTarget {
    JournalEntry,
    Book,
}

impl ShareTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareTarget::JournalEntry => "JOURNAL_ENTRY",
            ShareTarget::Book => "BOOK",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "JOURNAL_ENTRY" => Some(ShareTarget::JournalEntry),
            "BOOK" => Some(ShareTarget::Book),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareVisibility {
    #[default]
    PublicLink,
    Disabled,
}

impl ShareVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareVisibility::PublicLink => "PUBLIC_LINK",
            ShareVisibility::Disabled => "DISABLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PUBLIC_LINK" => Some(ShareVisibility::PublicLink),
            "DISABLED" => Some(ShareVisibility::Disabled),
            _ => None,
        }
    }
}

/// An opaque-token grant of lookup access to a book or journal entry.
///
/// `expired_at` is advisory metadata: the core resolves expired tokens
/// normally, and enforcement is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub id: String,
    pub owner_id: String,
    pub target_type: ShareTarget,
    pub target_id: String,
    pub visibility: ShareVisibility,
    pub share_token: String,
    pub created_at: DateTime<Utc>,
    pub expired_at: Option<DateTime<Utc>>,
}

/// Create user request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    /// Defaults to [`UserSettings::default`] when omitted
    #[serde(default)]
    pub settings: Option<UserSettings>,
}

/// Update user request; absent fields are left unchanged
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
    pub settings: Option<UserSettings>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookRequest {
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub cover_ref: Option<String>,
    /// Falls back to the owner's default visibility setting when omitted
    #[serde(default)]
    pub default_visibility: Option<Visibility>,
}

/// Update book request; absent fields are left unchanged
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookRequest {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_ref: Option<String>,
    pub default_visibility: Option<Visibility>,
}

/// Create journal entry request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJournalRequest {
    pub owner_id: String,
    pub book_id: String,
    pub title: String,
    /// Falls back to the book's default visibility when omitted
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Initial blocks, if the entry starts with content
    #[serde(default)]
    pub blocks: Vec<CreateBlockRequest>,
}

/// Update journal entry request; absent fields are left unchanged.
/// `tags` replaces the whole tag list when present.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateJournalRequest {
    pub id: String,
    pub title: Option<String>,
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
}

/// Create share request. The share token is minted by the share service;
/// the repository only persists it.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateShareRequest {
    pub owner_id: String,
    pub target_type: ShareTarget,
    pub target_id: String,
    #[serde(default)]
    pub visibility: ShareVisibility,
    pub share_token: String,
    pub expired_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::blocks::BlockContent;

    #[test]
    fn test_visibility_round_trips_through_text() {
        for v in [Visibility::Public, Visibility::Private] {
            assert_eq!(Visibility::parse(v.as_str()), Some(v));
        }
        assert_eq!(Visibility::parse("FRIENDS"), None);
    }

    #[test]
    fn test_share_enums_round_trip_through_text() {
        for t in [ShareTarget::JournalEntry, ShareTarget::Book] {
            assert_eq!(ShareTarget::parse(t.as_str()), Some(t));
        }
        for v in [ShareVisibility::PublicLink, ShareVisibility::Disabled] {
            assert_eq!(ShareVisibility::parse(v.as_str()), Some(v));
        }
    }

    #[test]
    fn test_sorted_blocks_orders_by_index() {
        let now = Utc::now();
        let entry = JournalEntry {
            id: "j1".into(),
            owner_id: "u1".into(),
            book_id: "b1".into(),
            title: "Day one".into(),
            visibility: Visibility::Private,
            tags: vec![],
            blocks: vec![
                Block {
                    id: "later".into(),
                    order_index: 5,
                    created_at: now,
                    updated_at: now,
                    content: BlockContent::Divider,
                },
                Block {
                    id: "first".into(),
                    order_index: 0,
                    created_at: now,
                    updated_at: now,
                    content: BlockContent::text("hello"),
                },
            ],
            metrics: MetricsCache::default(),
            created_at: now,
            updated_at: now,
        };

        let sorted = entry.sorted_blocks();
        assert_eq!(sorted[0].id, "first");
        assert_eq!(sorted[1].id, "later");
    }
}
