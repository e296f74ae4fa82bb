//! Storage module
//!
//! Provides content-addressed storage for media bytes (images, covers).

pub mod media_store;

pub use media_store::MediaStore;
