//! Quillbook core library
//!
//! Document model, metrics, storage, and sharing for a personal
//! journaling application. The crate exposes a [`database::Repository`]
//! contract with SQLite and in-memory backends, services layered on top
//! of it, and Markdown/ZIP export.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod id;
pub mod logging;
pub mod markdown;
pub mod metrics;
pub mod services;
pub mod stats;
pub mod storage;
