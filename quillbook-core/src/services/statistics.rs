//! Statistics service
//!
//! Read-only summaries of a user's writing over an inclusive calendar
//! date window: entries per day, word and image totals, and tag usage.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::DEFAULT_TOP_TAGS_LIMIT;
use crate::database::Repository;
use crate::error::Result;
use crate::stats::{self, TagCount};

/// Service for journal statistics
#[derive(Clone)]
pub struct StatisticsService {
    repo: Arc<dyn Repository>,
}

impl StatisticsService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Entries-per-day histogram over `[start, end]`
    pub async fn get_writing_frequency(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, u64>> {
        self.repo.get_writing_frequency(owner_id, start, end).await
    }

    /// Total words written over `[start, end]`
    pub async fn get_word_count_stats(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64> {
        self.repo.get_word_count_stats(owner_id, start, end).await
    }

    /// Total images attached over `[start, end]`
    pub async fn get_image_count_stats(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64> {
        self.repo.get_image_count_stats(owner_id, start, end).await
    }

    /// Tag usage counts over `[start, end]`
    pub async fn get_tag_distribution(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, u64>> {
        self.repo.get_tag_distribution(owner_id, start, end).await
    }

    /// Most-used tags over `[start, end]`, most frequent first.
    ///
    /// Ties keep first-occurrence order over the chronological entry
    /// scan, so repeated calls rank identically.
    pub async fn top_tags(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<usize>,
    ) -> Result<Vec<TagCount>> {
        let entries = self
            .repo
            .get_journals_by_owner_in_range(owner_id, start, end)
            .await?;
        Ok(stats::top_tags(&entries, limit.unwrap_or(DEFAULT_TOP_TAGS_LIMIT)))
    }
}
