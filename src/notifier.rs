// src/notifier.rs
//
// One-way channels out of the poller: desktop-style notifications and
// "state changed, re-render" pings for whatever UI is listening.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    /// number of new jobs worth notifying about
    pub count: usize,
    pub title: String,
    pub body: String,
}

impl NotificationEvent {
    pub fn new_jobs(count: usize, first_title: &str) -> Self {
        let plural = if count == 1 { "" } else { "s" };
        Self { count, title: format!("{count} new job{plural}"), body: first_title.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum UiEvent {
    StateChanged,
    Notification(NotificationEvent),
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::StateChanged => "state-changed",
            UiEvent::Notification(_) => "notification",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent);
}

/// Fan-out of [`UiEvent`]s; having no subscriber is fine.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<UiEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            debug!("no UI listeners");
        }
    }

    pub fn state_changed(&self) {
        self.publish(UiEvent::StateChanged);
    }
}

/// Logs the notification and forwards it to connected UIs.
#[derive(Clone)]
pub struct HubNotifier {
    hub: EventHub,
}

impl HubNotifier {
    pub fn new(hub: EventHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Notifier for HubNotifier {
    async fn notify(&self, event: NotificationEvent) {
        info!(count = event.count, "{}: {}", event.title, event.body);
        self.hub.publish(UiEvent::Notification(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_pluralises() {
        assert_eq!(NotificationEvent::new_jobs(1, "A").title, "1 new job");
        assert_eq!(NotificationEvent::new_jobs(2, "B").title, "2 new jobs");
    }

    #[tokio::test]
    async fn hub_notifier_forwards_to_subscribers() {
        let hub = EventHub::new(8);
        let mut rx = hub.subscribe();
        HubNotifier::new(hub.clone()).notify(NotificationEvent::new_jobs(3, "Rust")).await;

        match rx.recv().await.unwrap() {
            UiEvent::Notification(ev) => assert_eq!(ev.body, "Rust"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn publishing_without_listeners_is_harmless() {
        EventHub::new(1).state_changed();
    }
}
