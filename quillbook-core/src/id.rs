//! Entity id generation
//!
//! Ids are minted through an injected generator rather than a module-level
//! global, so repositories stay deterministic under test.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of unique entity ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Production generator backed by random v4 UUIDs.
#[derive(Debug, Default, Clone)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic generator for tests: `prefix-0001`, `prefix-0002`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{:04}", self.prefix, n)
    }
}
