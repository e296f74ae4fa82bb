//! Application configuration constants
//!
//! Central location for configuration constants and resource limits
//! used throughout the core.

// ===== Storage Layout =====

/// Filename of the SQLite database inside the application data directory
pub const DB_FILE_NAME: &str = "quillbook.db";

/// Directory for content-addressed media objects inside the data directory
pub const MEDIA_DIR_NAME: &str = "media";

/// Directory export bundles are written to by default
pub const EXPORTS_DIR_NAME: &str = "exports";

// ===== Database Limits =====

/// Maximum connections in the application pool.
/// SQLite serializes writers anyway; a handful of readers is plenty.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// Seconds a connection waits on a locked database before failing
pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;

// ===== Share Tokens =====

/// Length of generated share tokens in alphanumeric characters.
/// 22 characters at ~5.95 bits each gives roughly 131 bits of entropy.
pub const SHARE_TOKEN_LENGTH: usize = 22;

/// Attempts to mint a token that is not already in use before giving up
pub const MAX_SHARE_TOKEN_ATTEMPTS: usize = 3;

// ===== Statistics =====

/// Default number of tags returned by the top-tags view
pub const DEFAULT_TOP_TAGS_LIMIT: usize = 10;

// ===== Export =====

/// Maximum length of the slug derived from an entry title for filenames
pub const MAX_EXPORT_SLUG_LENGTH: usize = 40;
