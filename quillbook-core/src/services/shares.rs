//! Shares service
//!
//! Mints opaque share tokens for books and journal entries and resolves
//! them back to their targets. A share is revoked by deleting it; the
//! optional expiry timestamp is advisory metadata for callers and is not
//! enforced during resolution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

use crate::config::{MAX_SHARE_TOKEN_ATTEMPTS, SHARE_TOKEN_LENGTH};
use crate::database::{CreateShareRequest, Repository, Share, ShareTarget, ShareVisibility};
use crate::error::{AppError, Result};

/// Source of opaque share tokens
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Alphanumeric tokens from the thread-local CSPRNG.
///
/// 22 characters cover roughly 131 bits, so collisions are practically
/// impossible; the retry loop and unique index cover the remainder.
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SHARE_TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }
}

/// Service for minting and resolving shares
#[derive(Clone)]
pub struct ShareService {
    repo: Arc<dyn Repository>,
    tokens: Arc<dyn TokenGenerator>,
}

impl ShareService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self::with_token_generator(repo, Arc::new(RandomTokenGenerator))
    }

    pub fn with_token_generator(repo: Arc<dyn Repository>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self { repo, tokens }
    }

    /// Mint a share for a book or journal entry.
    ///
    /// The token is checked for prior use before insertion and
    /// regenerated on collision; the storage backend's uniqueness
    /// guarantee backstops the window between check and insert.
    pub async fn create_share(
        &self,
        owner_id: String,
        target_type: ShareTarget,
        target_id: String,
        expired_at: Option<DateTime<Utc>>,
    ) -> Result<Share> {
        tracing::info!("Creating share for {} {}", target_type.as_str(), target_id);

        for attempt in 1..=MAX_SHARE_TOKEN_ATTEMPTS {
            let token = self.tokens.generate();

            match self.repo.get_share_by_token(&token).await {
                Err(err) if err.is_not_found() => {
                    let share = self
                        .repo
                        .create_share(CreateShareRequest {
                            owner_id: owner_id.clone(),
                            target_type,
                            target_id: target_id.clone(),
                            visibility: ShareVisibility::default(),
                            share_token: token,
                            expired_at,
                        })
                        .await?;

                    tracing::info!("Share created successfully: {}", share.id);
                    return Ok(share);
                }
                Ok(_) => {
                    tracing::warn!("Share token collision on attempt {}, regenerating", attempt);
                }
                Err(err) => return Err(err),
            }
        }

        Err(AppError::Generic(
            "Could not mint a unique share token".to_string(),
        ))
    }

    /// Resolve a share by token. Expiry is not checked here.
    pub async fn resolve_share(&self, token: &str) -> Result<Share> {
        self.repo.get_share_by_token(token).await
    }

    /// List a user's shares
    pub async fn list_shares(&self, owner_id: &str) -> Result<Vec<Share>> {
        self.repo.get_shares_by_owner(owner_id).await
    }

    /// Revoke a share
    pub async fn delete_share(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting share: {}", id);

        self.repo.delete_share(id).await?;

        tracing::info!("Share deleted successfully: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryRepository;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out pre-seeded tokens, for exercising the collision path.
    struct QueuedTokenGenerator {
        tokens: Mutex<VecDeque<String>>,
    }

    impl QueuedTokenGenerator {
        fn new(tokens: &[&str]) -> Self {
            Self {
                tokens: Mutex::new(tokens.iter().map(|t| t.to_string()).collect()),
            }
        }
    }

    impl TokenGenerator for QueuedTokenGenerator {
        fn generate(&self) -> String {
            self.tokens.lock().unwrap().pop_front().expect("token queue empty")
        }
    }

    fn service_with_tokens(tokens: &[&str]) -> ShareService {
        ShareService::with_token_generator(
            Arc::new(MemoryRepository::new()),
            Arc::new(QueuedTokenGenerator::new(tokens)),
        )
    }

    #[test]
    fn test_random_tokens_are_alphanumeric_and_sized() {
        let generator = RandomTokenGenerator;
        let token = generator.generate();

        assert_eq!(token.len(), SHARE_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generator.generate());
    }

    #[tokio::test]
    async fn test_share_round_trip() {
        let service = ShareService::new(Arc::new(MemoryRepository::new()));

        let share = service
            .create_share("user-1".into(), ShareTarget::JournalEntry, "journal-1".into(), None)
            .await
            .unwrap();
        assert_eq!(share.target_id, "journal-1");
        assert_eq!(share.visibility, ShareVisibility::PublicLink);

        let resolved = service.resolve_share(&share.share_token).await.unwrap();
        assert_eq!(resolved.id, share.id);

        service.delete_share(&share.id).await.unwrap();
        let err = service.resolve_share(&share.share_token).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_collision_triggers_regeneration() {
        let service = service_with_tokens(&["dup", "dup", "fresh"]);

        let first = service
            .create_share("user-1".into(), ShareTarget::Book, "book-1".into(), None)
            .await
            .unwrap();
        assert_eq!(first.share_token, "dup");

        // Second mint draws "dup" again, detects the collision, and
        // falls through to "fresh".
        let second = service
            .create_share("user-1".into(), ShareTarget::Book, "book-2".into(), None)
            .await
            .unwrap();
        assert_eq!(second.share_token, "fresh");
    }

    #[tokio::test]
    async fn test_exhausted_attempts_fail() {
        let service = service_with_tokens(&["dup", "dup", "dup", "dup"]);

        service
            .create_share("user-1".into(), ShareTarget::Book, "book-1".into(), None)
            .await
            .unwrap();

        let err = service
            .create_share("user-1".into(), ShareTarget::Book, "book-2".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generic(_)));
    }

    #[tokio::test]
    async fn test_list_shares_by_owner() {
        let service = ShareService::new(Arc::new(MemoryRepository::new()));

        service
            .create_share("user-1".into(), ShareTarget::Book, "book-1".into(), None)
            .await
            .unwrap();
        service
            .create_share("user-2".into(), ShareTarget::Book, "book-2".into(), None)
            .await
            .unwrap();

        let shares = service.list_shares("user-1").await.unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].target_id, "book-1");
    }
}
