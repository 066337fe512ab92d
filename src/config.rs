// src/config.rs
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::credentials::DiscoveryRules;
use crate::error::{Error, Result};
use crate::graphql_client::Backoff;
use crate::poller::PollSettings;

/// Everything can be set with a flag or the matching `GIGWATCH_*` variable
/// (a `.env` file is read first).
#[derive(Debug, Clone, Parser)]
#[command(name = "gigwatch", version, about = "Watches a job marketplace for new postings")]
pub struct Config {
    /// Seconds between scheduled checks
    #[arg(env = "GIGWATCH_POLL_INTERVAL_SECS", long, default_value_t = 300)]
    pub poll_interval_secs: u64,

    /// Query used when the stored user query is blank
    #[arg(env = "GIGWATCH_DEFAULT_QUERY", long, default_value = "rust")]
    pub default_query: String,

    #[arg(env = "GIGWATCH_MAX_SEEN_JOBS", long, default_value_t = 200)]
    pub max_seen_jobs: usize,

    #[arg(env = "GIGWATCH_RECENT_JOBS_LIMIT", long, default_value_t = 20)]
    pub recent_jobs_limit: usize,

    #[arg(env = "GIGWATCH_SEARCH_PAGE_SIZE", long, default_value_t = 10)]
    pub search_page_size: u32,

    /// Comma separated, matched case-insensitively against job titles
    #[arg(env = "GIGWATCH_TITLE_EXCLUSIONS", long, value_delimiter = ',', default_value = "")]
    pub title_exclusions: Vec<String>,

    /// Comma separated, matched case-insensitively against client countries
    #[arg(env = "GIGWATCH_LOW_PRIORITY_COUNTRIES", long, value_delimiter = ',', default_value = "")]
    pub low_priority_countries: Vec<String>,

    #[arg(env = "GIGWATCH_GQL_ENDPOINT", long, default_value = "https://www.upwork.com/api/graphql/v1")]
    pub gql_endpoint: String,

    #[arg(env = "GIGWATCH_JOB_URL_BASE", long, default_value = "https://www.upwork.com/jobs")]
    pub job_url_base: String,

    #[arg(env = "GIGWATCH_COOKIE_DOMAIN", long, default_value = "upwork.com")]
    pub cookie_domain: String,

    /// Netscape cookies.txt exported from the browser
    #[arg(env = "GIGWATCH_COOKIE_FILE", long)]
    pub cookie_file: Option<PathBuf>,

    /// Raw `Cookie:` header, used when no cookie file is given
    #[arg(env = "GIGWATCH_COOKIE_HEADER", long, hide_env_values = true)]
    pub cookie_header: Option<String>,

    #[arg(env = "GIGWATCH_TOKEN_PREFIX", long, default_value = "oauth2v2_")]
    pub token_prefix: String,

    #[arg(env = "GIGWATCH_SESSION_SUFFIX", long, default_value = "sb")]
    pub session_suffix: String,

    #[arg(
        env = "GIGWATCH_DENIED_COOKIE_NAMES",
        long,
        value_delimiter = ',',
        default_value = "visitor,master_access_token"
    )]
    pub denied_cookie_names: Vec<String>,

    #[arg(env = "GIGWATCH_BACKOFF_BASE_MS", long, default_value_t = 500)]
    pub backoff_base_ms: u64,

    #[arg(env = "GIGWATCH_BACKOFF_JITTER_MS", long, default_value_t = 1000)]
    pub backoff_jitter_ms: u64,

    #[arg(env = "GIGWATCH_HTTP_TIMEOUT_SECS", long, default_value_t = 20)]
    pub http_timeout_secs: u64,

    /// `memory` keeps state for the lifetime of the process only
    #[arg(env = "GIGWATCH_DATABASE_URL", long, default_value = "sqlite://gigwatch.db")]
    pub database_url: String,

    #[arg(env = "GIGWATCH_LISTEN", long, default_value = "127.0.0.1:3030")]
    pub listen: SocketAddr,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(Error::Config("poll interval must be at least one second".into()));
        }
        if self.max_seen_jobs == 0 {
            return Err(Error::Config("max seen jobs must be positive".into()));
        }
        if self.cookie_file.is_none() && self.cookie_header.is_none() {
            return Err(Error::Config("set GIGWATCH_COOKIE_FILE or GIGWATCH_COOKIE_HEADER".into()));
        }
        Ok(())
    }

    pub fn discovery_rules(&self) -> DiscoveryRules {
        DiscoveryRules {
            domain: self.cookie_domain.clone(),
            value_prefix: self.token_prefix.clone(),
            session_suffix: self.session_suffix.clone(),
            denied_name_parts: self
                .denied_cookie_names
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            base: Duration::from_millis(self.backoff_base_ms),
            jitter: Duration::from_millis(self.backoff_jitter_ms),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_seen: self.max_seen_jobs,
            recent_limit: self.recent_jobs_limit,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
