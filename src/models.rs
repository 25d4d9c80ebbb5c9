use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INITIAL_EASE_FACTOR: f64 = 2.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub term: String,
    pub translation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub external_id: String,
    pub daily_new_item_limit: i64,
}

/// Scheduling state of one (user, item) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: i64,
    pub external_id: String,
    pub item_id: i64,
    pub repetition_count: i64,
    pub interval_days: i64,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub added_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

/// What the orchestrator presents: the record plus the item it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub record: ProgressRecord,
    pub item: Item,
    pub is_new: bool,
}

/// One row handed over by the catalog upload parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRow {
    pub term: Option<String>,
    pub translation: Option<String>,
}

impl CatalogRow {
    pub fn new(term: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            term: Some(term.into()),
            translation: Some(translation.into()),
        }
    }

    /// Trimmed `(term, translation)`, or the reason the row is unusable.
    pub fn normalized(&self) -> Result<(String, String), String> {
        let term = self
            .term
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| "missing term".to_string())?;
        let translation = self
            .translation
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| "missing translation".to_string())?;
        Ok((term.to_string(), translation.to_string()))
    }
}

impl<T: Into<String>, U: Into<String>> From<(T, U)> for CatalogRow {
    fn from((term, translation): (T, U)) -> Self {
        Self::new(term, translation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    /// 1-based position in the uploaded batch.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: Vec<RejectedRow>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.inserted + self.duplicates + self.rejected.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub external_id: String,
    pub registered: bool,
    pub daily_new_item_limit: i64,
    pub tracked_items: i64,
    pub due_now: i64,
    pub new_today: i64,
    pub remaining_new_today: i64,
    pub unseen_items: i64,
}
