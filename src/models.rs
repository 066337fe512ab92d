// src/models.rs
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// defaults for fields older snapshots may not carry
fn default_na() -> String { "N/A".to_string() }
fn default_false() -> bool { false }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    #[serde(rename = "type", default = "default_na")]
    pub kind: String,
    #[serde(default = "default_na")]
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    #[serde(default = "default_na")]
    pub country: String,
    pub rating: Option<f64>,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(default = "default_false")]
    pub payment_verified: bool,
}

/// A search hit. `id` is the job cipher text, stable across polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default = "default_na")]
    pub posted_on: String,
    pub budget: Budget,
    pub client: ClientInfo,
    #[serde(default)]
    pub skills: Vec<String>,

    // --- set by the poller's filters ---
    #[serde(default)]
    pub is_excluded: bool,
    #[serde(default)]
    pub is_low_priority: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    pub jobs_posted: u64,
    pub total_hires: u64,
    pub active_contracts: u64,
    pub total_spent: f64,
    pub feedback_score: f64,
    pub feedback_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub applicants: u64,
    pub interviewing: u64,
    pub invites_sent: u64,
    pub last_viewed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// A [`Job`] merged with the extended fields of the details query.
/// Built on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    #[serde(flatten)]
    pub job: Job,
    pub description: String,
    pub client_stats: ClientStats,
    pub activity: Activity,
    pub bid_stats: Option<BidStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStatus {
    pub status: String,
    /// epoch millis of the last successful cycle
    pub last_check: Option<i64>,
}

/// Ids already notified about, oldest first. Never longer than `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenSet {
    ids: VecDeque<String>,
    max: usize,
}

impl SeenSet {
    pub fn new(ids: Vec<String>, max: usize) -> Self {
        let mut set = Self { ids: ids.into(), max };
        set.evict();
        set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    /// Appends ids in order and evicts from the front until within bounds.
    pub fn extend<I: IntoIterator<Item = String>>(&mut self, ids: I) {
        self.ids.extend(ids);
        self.evict();
    }

    fn evict(&mut self) {
        while self.ids.len() > self.max {
            self.ids.pop_front();
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ids.into()
    }
}
