//! Services module
//!
//! Business logic services that coordinate between callers and repository.

pub mod export;
pub mod journals;
pub mod shares;
pub mod statistics;

pub use export::ExportService;
pub use journals::JournalsService;
pub use shares::{RandomTokenGenerator, ShareService, TokenGenerator};
pub use statistics::StatisticsService;
