// src/main.rs

/*=============================================================================
  gigwatch - watch a job marketplace for new postings.
  Stack: Warp (HTTP) | Tokio (async) | SQLx (SQLite) | Reqwest | Tracing

  Polls the site's private GraphQL API with the session tokens found in the
  browser cookie jar, keeps the last working token sticky, tags and dedups
  the results, stores them and raises a notification for new jobs.

  Endpoints
  - GET  /status              -> status text, last check, query, theme
  - GET  /jobs                -> recent jobs (excluded + dismissed hidden)
  - POST /check               -> run a check now
  - GET  /jobs/{id}/details   -> extended details for a listed job
  - POST /jobs/{id}/delete    -> dismiss a job
  - POST /query               -> form: query
  - POST /theme               -> form: theme=light|dark
  - GET  /events              -> server-sent events (state-changed, notification)

  Environment (.env): see `gigwatch --help`; at minimum
  GIGWATCH_COOKIE_FILE or GIGWATCH_COOKIE_HEADER.
=============================================================================*/

mod config;
mod cookies;
mod credentials;
mod error;
mod filters;
mod graphql_client;
mod handlers;
mod job_fetcher;
mod logging;
mod models;
mod notifier;
mod poller;
mod store;

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::info;
use warp::Filter;

use crate::config::Config;
use crate::cookies::{CookieFileSource, CredentialSource, StaticCookieSource};
use crate::credentials::CredentialDiscovery;
use crate::filters::JobFilters;
use crate::graphql_client::GraphQlClient;
use crate::job_fetcher::JobFetcher;
use crate::notifier::{EventHub, HubNotifier};
use crate::poller::Poller;
use crate::store::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logging::init();

    let config = Config::parse();
    config.validate()?;

    let storage = Storage::open(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    let source: Arc<dyn CredentialSource> = match (&config.cookie_file, &config.cookie_header) {
        (Some(path), _) => Arc::new(CookieFileSource::new(path.clone())),
        (None, Some(header)) => Arc::new(StaticCookieSource::from_header(header)),
        (None, None) => anyhow::bail!("no cookie source configured"),
    };
    let discovery = CredentialDiscovery::new(source, config.discovery_rules());

    let client = GraphQlClient::new(
        config.gql_endpoint.clone(),
        config.http_timeout(),
        storage.clone(),
        discovery,
        config.backoff(),
    )
    .context("failed to build HTTP client")?;

    let fetcher = JobFetcher::new(
        client,
        storage.clone(),
        config.default_query.clone(),
        config.search_page_size,
        config.job_url_base.clone(),
    );

    let hub = EventHub::new(64);
    let poller = Arc::new(Poller::new(
        fetcher.clone(),
        storage.clone(),
        JobFilters::new(config.title_exclusions.clone(), config.low_priority_countries.clone()),
        Arc::new(HubNotifier::new(hub.clone())),
        hub.clone(),
        config.poll_settings(),
    ));

    let cancellation_token = CancellationToken::new();
    let poll_task = tokio::spawn(poller.clone().run(cancellation_token.child_token()));

    let routes = routes(storage, fetcher, poller, hub);

    let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown(config.listen, async {
        tokio::signal::ctrl_c().await.ok();
        info!("shutting down");
    })
    .with_context(|| format!("failed to bind {}", config.listen))?;

    info!("Server started at http://{addr}");
    server.await;

    cancellation_token.cancel();
    poll_task.await.context("poller task panicked")?;
    Ok(())
}

fn routes(
    storage: Storage,
    fetcher: JobFetcher,
    poller: Arc<Poller>,
    hub: EventHub,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let status = warp::get()
        .and(warp::path("status"))
        .and(warp::path::end())
        .and(with_storage(storage.clone()))
        .and(with_poller(poller.clone()))
        .and_then(handlers::status_handler);

    let jobs = warp::get()
        .and(warp::path("jobs"))
        .and(warp::path::end())
        .and(with_storage(storage.clone()))
        .and_then(handlers::jobs_handler);

    let check = warp::post()
        .and(warp::path("check"))
        .and(warp::path::end())
        .and(with_poller(poller))
        .and_then(handlers::check_handler);

    let details = warp::get()
        .and(warp::path!("jobs" / String / "details"))
        .and(with_fetcher(fetcher))
        .and_then(handlers::details_handler);

    let delete = warp::post()
        .and(warp::path!("jobs" / String / "delete"))
        .and(with_storage(storage.clone()))
        .and(with_hub(hub.clone()))
        .and_then(handlers::delete_handler);

    let query = warp::post()
        .and(warp::path("query"))
        .and(warp::path::end())
        .and(warp::body::form::<HashMap<String, String>>())
        .and(with_storage(storage.clone()))
        .and(with_hub(hub.clone()))
        .and_then(handlers::query_handler);

    let theme = warp::post()
        .and(warp::path("theme"))
        .and(warp::path::end())
        .and(warp::body::form::<HashMap<String, String>>())
        .and(with_storage(storage))
        .and(with_hub(hub.clone()))
        .and_then(handlers::theme_handler);

    let events = warp::get()
        .and(warp::path("events"))
        .and(warp::path::end())
        .and(with_hub(hub))
        .and_then(handlers::events_handler);

    status
        .or(jobs)
        .or(check)
        .or(details)
        .or(delete)
        .or(query)
        .or(theme)
        .or(events)
        .with(warp::trace::request())
}

fn with_storage(storage: Storage) -> impl Filter<Extract = (Storage,), Error = Infallible> + Clone {
    warp::any().map(move || storage.clone())
}

fn with_fetcher(fetcher: JobFetcher) -> impl Filter<Extract = (JobFetcher,), Error = Infallible> + Clone {
    warp::any().map(move || fetcher.clone())
}

fn with_poller(poller: Arc<Poller>) -> impl Filter<Extract = (Arc<Poller>,), Error = Infallible> + Clone {
    warp::any().map(move || poller.clone())
}

fn with_hub(hub: EventHub) -> impl Filter<Extract = (EventHub,), Error = Infallible> + Clone {
    warp::any().map(move || hub.clone())
}
