// src/filters.rs
use crate::models::Job;

/// Case-insensitive term lists applied to every fetched job.
#[derive(Debug, Clone, Default)]
pub struct JobFilters {
    title_exclusions: Vec<String>,
    low_priority_countries: Vec<String>,
}

fn normalize(terms: Vec<String>) -> Vec<String> {
    terms
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl JobFilters {
    pub fn new(title_exclusions: Vec<String>, low_priority_countries: Vec<String>) -> Self {
        Self {
            title_exclusions: normalize(title_exclusions),
            low_priority_countries: normalize(low_priority_countries),
        }
    }

    /// Sets `is_excluded`, `is_low_priority` and the priority reason.
    pub fn tag(&self, mut job: Job) -> Job {
        let title = job.title.to_lowercase();
        job.is_excluded = self.title_exclusions.iter().any(|term| title.contains(term.as_str()));

        let country = job.client.country.to_lowercase();
        job.is_low_priority = self.low_priority_countries.iter().any(|term| country.contains(term.as_str()));
        job.priority_reason = job
            .is_low_priority
            .then(|| format!("Low priority: {}", job.client.country));
        job
    }

    /// A job worth a desktop notification.
    pub fn is_notifiable(job: &Job) -> bool {
        !job.is_excluded && !job.is_low_priority
    }
}
