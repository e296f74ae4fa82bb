//! Error types for the Quillbook core
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to view-model layers as strings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Journal entry not found: {0}")]
    JournalNotFound(String),

    #[error("Share not found: {0}")]
    ShareNotFound(String),

    /// Reserved for callers that opt into stricter input checking.
    /// The core itself accepts empty titles and texts.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Media store error: {0}")]
    MediaStore(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// True for every "referenced id does not exist" failure, regardless
    /// of which entity was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::UserNotFound(_)
                | AppError::BookNotFound(_)
                | AppError::JournalNotFound(_)
                | AppError::ShareNotFound(_)
        )
    }
}

impl serde::Serialize for AppError {
    // Spelled out because the crate-wide single-parameter alias below
    // shadows the prelude's Result inside this module.
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
