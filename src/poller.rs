// src/poller.rs
//
// One poll cycle: fetch, tag, dedup against seen/deleted ids, persist,
// notify. Errors never escape a cycle; they end up in the status text.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::filters::JobFilters;
use crate::job_fetcher::JobFetcher;
use crate::models::{Job, SeenSet};
use crate::notifier::{EventHub, NotificationEvent, Notifier};
use crate::store::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { new_jobs: usize },
    Failed(String),
    /// Another cycle was already running; this trigger was folded into it.
    Coalesced,
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_seen: usize,
    pub recent_limit: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self { interval: Duration::from_secs(300), max_seen: 200, recent_limit: 20 }
    }
}

pub struct Poller {
    fetcher: JobFetcher,
    storage: Storage,
    filters: JobFilters,
    notifier: Arc<dyn Notifier>,
    hub: EventHub,
    settings: PollSettings,
    // held for the whole cycle; at most one cycle in flight
    in_flight: Arc<Mutex<()>>,
}

impl Poller {
    pub fn new(
        fetcher: JobFetcher,
        storage: Storage,
        filters: JobFilters,
        notifier: Arc<dyn Notifier>,
        hub: EventHub,
        settings: PollSettings,
    ) -> Self {
        Self { fetcher, storage, filters, notifier, hub, settings, in_flight: Arc::new(Mutex::new(())) }
    }

    pub fn is_checking(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    async fn write_status(&self, status: &str) {
        if let Err(e) = self.storage.set_status(status).await {
            error!("Failed to store status '{status}': {e}");
        }
    }

    pub async fn run_cycle(&self, trigger: Trigger) -> CycleOutcome {
        match self.in_flight.clone().try_lock_owned() {
            Ok(guard) => self.cycle(trigger, guard).await,
            Err(_) => {
                info!(?trigger, "check already in progress, coalescing");
                CycleOutcome::Coalesced
            }
        }
    }

    // `_guard` keeps the single-flight lock until the cycle is over.
    async fn cycle(&self, trigger: Trigger, _guard: OwnedMutexGuard<()>) -> CycleOutcome {
        info!(?trigger, "Checking for new jobs...");
        self.write_status("Checking...").await;
        self.hub.state_changed();

        let outcome = match self.check().await {
            Ok(new_jobs) => {
                self.write_status(&format!("Checked. New: {new_jobs}")).await;
                if let Err(e) = self.storage.set_last_check(Utc::now().timestamp_millis()).await {
                    error!("Failed to store last check time: {e}");
                }
                CycleOutcome::Completed { new_jobs }
            }
            Err(e) => {
                error!("Poll cycle failed: {e}");
                let message = e.to_string();
                self.write_status(&format!("Error: {message}")).await;
                CycleOutcome::Failed(message)
            }
        };

        self.hub.state_changed();
        outcome
    }

    async fn check(&self) -> Result<usize> {
        let query = self.storage.user_query().await?;
        let mut seen = SeenSet::new(self.storage.seen_jobs().await?, self.settings.max_seen);
        let deleted: HashSet<String> = self.storage.deleted_jobs().await?.into_iter().collect();

        let jobs: Vec<Job> = self
            .fetcher
            .search(&query)
            .await?
            .into_iter()
            .map(|job| self.filters.tag(job))
            .collect();

        let mut new_ids: Vec<String> = Vec::new();
        let mut notifiable: Vec<&Job> = Vec::new();
        for job in &jobs {
            if seen.contains(&job.id) || deleted.contains(&job.id) || new_ids.contains(&job.id) {
                continue;
            }
            new_ids.push(job.id.clone());
            if JobFilters::is_notifiable(job) {
                notifiable.push(job);
            }
        }
        let notification = notifiable
            .first()
            .map(|first| NotificationEvent::new_jobs(notifiable.len(), &first.title));
        let new_count = new_ids.len();

        if !new_ids.is_empty() {
            seen.extend(new_ids);
            self.storage.set_seen_jobs(&seen.into_vec()).await?;
        }

        let recent: Vec<Job> = jobs
            .into_iter()
            .filter(|job| !deleted.contains(&job.id))
            .take(self.settings.recent_limit)
            .collect();
        self.storage.set_recent_jobs(&recent).await?;

        if let Some(event) = notification {
            self.notifier.notify(event).await;
        }

        info!("New jobs: {new_count}");
        Ok(new_count)
    }

    /// Starts a manual check in the background. `None` when a cycle is
    /// already running; the lock is taken before this returns, so a timer
    /// tick can no longer slip in between.
    pub fn trigger_manual(self: &Arc<Self>) -> Option<JoinHandle<CycleOutcome>> {
        let guard = self.in_flight.clone().try_lock_owned().ok()?;
        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.cycle(Trigger::Manual, guard).await }))
    }

    /// Runs a cycle immediately and then on every interval tick until
    /// `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.settings.interval.as_secs(), "poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let CycleOutcome::Failed(reason) = self.run_cycle(Trigger::Timer).await {
                        warn!("scheduled check failed, retrying next tick: {reason}");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("poller stopping");
                    break;
                }
            }
        }
    }
}
