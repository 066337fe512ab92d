// src/graphql_client.rs
//
// Every GraphQL call goes through `GraphQlClient::execute`: the last token
// that worked is tried first, then every token found in the cookie jar.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::credentials::{token_tail, CredentialDiscovery};
use crate::error::{Error, Result};
use crate::store::Storage;

#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: Value,
}

/// Outcome of one request made with one token.
#[derive(Debug)]
pub enum Attempt {
    Success(Value),
    /// The token is no good for this call; try the next one.
    Recoverable(Error),
    /// Stops the whole call regardless of remaining tokens.
    Fatal(Error),
}

/// Pause after a 429 before the next token is tried.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub base: Duration,
    pub jitter: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { base: Duration::from_millis(500), jitter: Duration::from_millis(1000) }
    }
}

impl Backoff {
    #[cfg(test)]
    pub fn none() -> Self {
        Self { base: Duration::ZERO, jitter: Duration::ZERO }
    }

    pub fn delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 { 0 } else { rand::thread_rng().gen_range(0..=jitter_ms) };
        self.base + Duration::from_millis(extra)
    }

    async fn wait(&self) {
        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn graphql_error_message(body: &Value) -> Option<String> {
    match body.get("errors") {
        None | Some(Value::Null) => None,
        Some(errors) => Some(
            errors
                .get(0)
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("GraphQL error received from server.")
                .to_string(),
        ),
    }
}

/// Tries `candidates` in order until one succeeds. Recoverable failures are
/// remembered so the last one can be reported if every token fails.
pub async fn rotate<F, Fut>(candidates: &[String], backoff: &Backoff, mut attempt: F) -> Result<(String, Value)>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Attempt>,
{
    let mut last_error: Option<Error> = None;

    for token in candidates {
        match attempt(token.clone()).await {
            Attempt::Success(data) => return Ok((token.clone(), data)),
            Attempt::Recoverable(err) => {
                warn!("Token ...{} failed: {err}", token_tail(token));
                let rate_limited = matches!(err, Error::RateLimited);
                last_error = Some(err);
                if rate_limited {
                    backoff.wait().await;
                }
            }
            Attempt::Fatal(err) => {
                error!("Aborting token rotation: {err}");
                return Err(err);
            }
        }
    }

    Err(last_error.unwrap_or(Error::AllCredentialsFailed))
}

#[derive(Clone)]
pub struct GraphQlClient {
    client: Client,
    endpoint: String,
    storage: Storage,
    discovery: CredentialDiscovery,
    backoff: Backoff,
}

impl GraphQlClient {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        storage: Storage,
        discovery: CredentialDiscovery,
        backoff: Backoff,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("gigwatch/0.1")
            .build()?;

        Ok(Self { client, endpoint: endpoint.into(), storage, discovery, backoff })
    }

    async fn send(&self, alias: &str, token: &str, request: &GraphQlRequest) -> Attempt {
        let resp = match self
            .client
            .post(&self.endpoint)
            .query(&[("alias", alias)])
            .bearer_auth(token)
            .json(request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return Attempt::Recoverable(Error::Network(e)),
        };

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Attempt::Recoverable(Error::Unauthorized(token_tail(token).to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::Recoverable(Error::RateLimited);
        }
        if !status.is_success() {
            return Attempt::Fatal(Error::HttpStatus(status.as_u16()));
        }

        let body: Value = match resp.json().await {
            Ok(body) => body,
            Err(e) => return Attempt::Recoverable(Error::Network(e)),
        };
        match graphql_error_message(&body) {
            Some(message) => Attempt::Recoverable(Error::GraphQl(message)),
            None => Attempt::Success(body),
        }
    }

    /// Runs one GraphQL operation and returns the decoded response body.
    pub async fn execute(&self, alias: &str, request: &GraphQlRequest) -> Result<Value> {
        // --- sticky token ---
        if let Some(sticky) = self.storage.last_good_token().await? {
            info!("Trying sticky token ending in ...{} for alias: {alias}", token_tail(&sticky));
            match self.send(alias, &sticky, request).await {
                Attempt::Success(data) => {
                    info!("Sticky token ...{} worked!", token_tail(&sticky));
                    return Ok(data);
                }
                Attempt::Recoverable(err) | Attempt::Fatal(err) => {
                    warn!(
                        "Sticky token ...{} failed ({err}). Clearing and starting full rotation.",
                        token_tail(&sticky)
                    );
                    self.storage.set_last_good_token(None).await?;
                }
            }
        }

        // --- full rotation ---
        info!("Starting full token rotation...");
        let candidates = self.discovery.discover().await?;
        if candidates.is_empty() {
            return Err(Error::NoCredential);
        }

        let (token, data) = rotate(&candidates, &self.backoff, move |token| async move {
            self.send(alias, &token, request).await
        })
        .await?;

        info!("Found new valid token ...{}. Saving as sticky token.", token_tail(&token));
        self.storage.set_last_good_token(Some(&token)).await?;
        Ok(data)
    }
}
