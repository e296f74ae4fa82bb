//! Statistics aggregation
//!
//! Pure fold helpers over journal entry slices. The repository's
//! statistics reads fetch the owner's entries for a date window and hand
//! them to these functions, so both storage backends share one
//! aggregation path.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::database::models::JournalEntry;

/// A tag and the number of times it occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// True when the entry's creation date (UTC calendar date) falls inside
/// the inclusive `[start, end]` window.
pub fn in_date_range(entry: &JournalEntry, start: NaiveDate, end: NaiveDate) -> bool {
    let date = entry.created_at.date_naive();
    date >= start && date <= end
}

/// Entries-per-day histogram, keyed by UTC calendar date.
///
/// Days with no entries are absent from the map rather than present with
/// a zero count; the `BTreeMap` keeps the days sorted for callers that
/// render the histogram.
pub fn writing_frequency(entries: &[JournalEntry]) -> BTreeMap<NaiveDate, u64> {
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for entry in entries {
        *by_day.entry(entry.created_at.date_naive()).or_insert(0) += 1;
    }
    by_day
}

/// Sum of the cached word counts across the entries.
pub fn word_count_total(entries: &[JournalEntry]) -> u64 {
    entries.iter().map(|e| e.metrics.word_count).sum()
}

/// Sum of the cached image counts across the entries.
pub fn image_count_total(entries: &[JournalEntry]) -> u64 {
    entries.iter().map(|e| e.metrics.image_count).sum()
}

/// Tag usage counts across the entries.
///
/// An entry carrying the same tag twice counts it twice; the tag list is
/// stored verbatim and duplicates are the author's to keep.
pub fn tag_distribution(entries: &[JournalEntry]) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for entry in entries {
        for tag in &entry.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// The `limit` most-used tags, most frequent first.
///
/// Ties keep the order in which the tags were first seen while scanning
/// the entries, so the result is stable for a given entry ordering.
pub fn top_tags(entries: &[JournalEntry], limit: usize) -> Vec<TagCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for entry in entries {
        for tag in &entry.tags {
            let seen = counts.contains_key(tag.as_str());
            *counts.entry(tag.as_str()).or_insert(0) += 1;
            if !seen {
                first_seen.push(tag.as_str());
            }
        }
    }

    let mut ranked: Vec<TagCount> = first_seen
        .into_iter()
        .map(|tag| TagCount {
            tag: tag.to_string(),
            count: counts[tag],
        })
        .collect();
    // Stable sort preserves first-seen order among equal counts.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}
