// src/handlers.rs
//
// The UI side of the service: read the stored state, ask for a manual
// check or job details, dismiss jobs, change the query and theme.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::sse::Event;
use warp::{Rejection, Reply};

use crate::error::Error;
use crate::job_fetcher::JobFetcher;
use crate::models::Job;
use crate::notifier::EventHub;
use crate::poller::Poller;
use crate::store::{Storage, Theme};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub status: String,
    pub last_check: Option<i64>,
    pub query: String,
    pub theme: Theme,
    pub checking: bool,
}

fn error_reply(message: impl Into<String>, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message.into() })), status).into_response()
}

fn storage_error(e: Error) -> Response {
    error!("storage error: {e}");
    error_reply(format!("DB error: {e}"), StatusCode::INTERNAL_SERVER_ERROR)
}

/// Jobs the list view shows: stored snapshot minus excluded and dismissed.
pub fn visible_jobs(jobs: Vec<Job>, deleted: &[String]) -> Vec<Job> {
    jobs.into_iter()
        .filter(|job| !job.is_excluded && !deleted.contains(&job.id))
        .collect()
}

pub async fn status_handler(storage: Storage, poller: Arc<Poller>) -> Result<Response, Rejection> {
    let view = async {
        let status = storage.poll_status().await?;
        Ok::<_, Error>(StatusView {
            status: status.status,
            last_check: status.last_check,
            query: storage.user_query().await?,
            theme: storage.theme().await?,
            checking: poller.is_checking(),
        })
    };
    match view.await {
        Ok(view) => Ok(warp::reply::json(&view).into_response()),
        Err(e) => Ok(storage_error(e)),
    }
}

pub async fn jobs_handler(storage: Storage) -> Result<Response, Rejection> {
    let jobs = match storage.recent_jobs().await {
        Ok(jobs) => jobs,
        Err(e) => return Ok(storage_error(e)),
    };
    let deleted = match storage.deleted_jobs().await {
        Ok(deleted) => deleted,
        Err(e) => return Ok(storage_error(e)),
    };
    Ok(warp::reply::json(&visible_jobs(jobs, &deleted)).into_response())
}

pub async fn check_handler(poller: Arc<Poller>) -> Result<Response, Rejection> {
    // the spawned cycle is detached; its outcome lands in the stored status
    let started = match poller.trigger_manual() {
        Some(_cycle) => true,
        None => {
            info!("manual check requested while one is running");
            false
        }
    };
    Ok(warp::reply::with_status(warp::reply::json(&json!({ "started": started })), StatusCode::ACCEPTED)
        .into_response())
}

pub async fn details_handler(job_id: String, fetcher: JobFetcher) -> Result<Response, Rejection> {
    match fetcher.details(&job_id).await {
        Ok(details) => Ok(warp::reply::json(&details).into_response()),
        Err(e @ Error::JobNotFound(_)) => Ok(error_reply(e.to_string(), StatusCode::NOT_FOUND)),
        Err(e @ (Error::Storage(_) | Error::Serialization(_))) => Ok(storage_error(e)),
        Err(e) => {
            warn!("details for {job_id} failed: {e}");
            Ok(error_reply(e.to_string(), StatusCode::BAD_GATEWAY))
        }
    }
}

pub async fn delete_handler(job_id: String, storage: Storage, hub: EventHub) -> Result<Response, Rejection> {
    match storage.add_deleted_job(&job_id).await {
        Ok(deleted) => {
            hub.state_changed();
            Ok(warp::reply::json(&json!({ "deleted": deleted })).into_response())
        }
        Err(e) => Ok(storage_error(e)),
    }
}

pub async fn query_handler(
    form: HashMap<String, String>,
    storage: Storage,
    hub: EventHub,
) -> Result<Response, Rejection> {
    let query = form.get("query").map(|q| q.trim().to_string()).unwrap_or_default();
    match storage.set_user_query(&query).await {
        Ok(()) => {
            hub.state_changed();
            Ok(warp::reply::json(&json!({ "query": query })).into_response())
        }
        Err(e) => Ok(storage_error(e)),
    }
}

pub async fn theme_handler(
    form: HashMap<String, String>,
    storage: Storage,
    hub: EventHub,
) -> Result<Response, Rejection> {
    let theme: Theme = match form.get("theme").map(|t| t.parse()) {
        Some(Ok(theme)) => theme,
        Some(Err(msg)) => return Ok(error_reply(msg, StatusCode::BAD_REQUEST)),
        None => return Ok(error_reply("missing theme", StatusCode::BAD_REQUEST)),
    };
    match storage.set_theme(theme).await {
        Ok(()) => {
            hub.state_changed();
            Ok(warp::reply::json(&json!({ "theme": theme })).into_response())
        }
        Err(e) => Ok(storage_error(e)),
    }
}

pub async fn events_handler(hub: EventHub) -> Result<Response, Rejection> {
    let stream = BroadcastStream::new(hub.subscribe()).filter_map(|msg| match msg {
        Ok(event) => Some(Ok::<_, Infallible>(
            Event::default()
                .event(event.name())
                .data(serde_json::to_string(&event).unwrap_or_default()),
        )),
        // lagged receiver; the next event still triggers a re-render
        Err(_) => None,
    });
    Ok(warp::sse::reply(warp::sse::keep_alive().stream(stream)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Budget, ClientInfo};

    fn job(id: &str, excluded: bool) -> Job {
        Job {
            id: id.into(),
            title: id.into(),
            url: String::new(),
            posted_on: "N/A".into(),
            budget: Budget { kind: "N/A".into(), amount: "Hourly".into() },
            client: ClientInfo { country: "N/A".into(), rating: None, total_spent: 0.0, payment_verified: false },
            skills: vec![],
            is_excluded: excluded,
            is_low_priority: false,
            priority_reason: None,
        }
    }

    #[test]
    fn visible_jobs_hide_excluded_and_deleted() {
        let jobs = vec![job("a", false), job("b", true), job("c", false)];
        let visible = visible_jobs(jobs, &["c".to_string()]);
        assert_eq!(visible.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(), vec!["a"]);
    }

    #[tokio::test]
    async fn invalid_theme_is_rejected() {
        let storage = Storage::in_memory();
        let form = HashMap::from([("theme".to_string(), "neon".to_string())]);
        let resp = theme_handler(form, storage.clone(), EventHub::new(1)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(storage.theme().await.unwrap(), Theme::Light);
    }

    #[tokio::test]
    async fn delete_marks_job_and_pings_ui() {
        let storage = Storage::in_memory();
        let hub = EventHub::new(4);
        let mut rx = hub.subscribe();

        let resp = delete_handler("~1".into(), storage.clone(), hub).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(storage.deleted_jobs().await.unwrap(), vec!["~1"]);
        assert!(rx.try_recv().is_ok());
    }
}
