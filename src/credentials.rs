// src/credentials.rs
//
// Picks bearer tokens out of the cookie jar, session-bound ones first.

use std::sync::Arc;

use tracing::info;

use crate::cookies::{Cookie, CredentialSource};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CredentialRank {
    SessionBound,
    Generic,
    Excluded,
}

#[derive(Debug, Clone)]
pub struct DiscoveryRules {
    pub domain: String,
    /// cookie values must start with this to be considered a token
    pub value_prefix: String,
    pub session_suffix: String,
    pub denied_name_parts: Vec<String>,
}

impl Default for DiscoveryRules {
    fn default() -> Self {
        Self {
            domain: "upwork.com".to_string(),
            value_prefix: "oauth2v2_".to_string(),
            session_suffix: "sb".to_string(),
            denied_name_parts: vec!["visitor".to_string(), "master_access_token".to_string()],
        }
    }
}

impl DiscoveryRules {
    /// `None` when the cookie does not hold a token at all.
    pub fn rank(&self, cookie: &Cookie) -> Option<CredentialRank> {
        if !cookie.value.starts_with(&self.value_prefix) {
            return None;
        }
        // denylist wins even over the session suffix
        if self.denied_name_parts.iter().any(|part| cookie.name.contains(part.as_str())) {
            return Some(CredentialRank::Excluded);
        }
        if cookie.name.ends_with(&self.session_suffix) {
            return Some(CredentialRank::SessionBound);
        }
        Some(CredentialRank::Generic)
    }
}

/// Orders candidate tokens: session-bound in jar order, then the generic
/// ones, without duplicates. Excluded cookies never make it out.
pub fn rank_candidates(cookies: &[Cookie], rules: &DiscoveryRules) -> Vec<String> {
    let mut session_bound = Vec::new();
    let mut generic = Vec::new();
    for cookie in cookies {
        match rules.rank(cookie) {
            Some(CredentialRank::SessionBound) => session_bound.push(cookie.value.clone()),
            Some(CredentialRank::Generic) => generic.push(cookie.value.clone()),
            Some(CredentialRank::Excluded) | None => {}
        }
    }

    let mut candidates: Vec<String> = Vec::with_capacity(session_bound.len() + generic.len());
    for value in session_bound.into_iter().chain(generic) {
        if !candidates.contains(&value) {
            candidates.push(value);
        }
    }
    candidates
}

#[derive(Clone)]
pub struct CredentialDiscovery {
    source: Arc<dyn CredentialSource>,
    rules: DiscoveryRules,
}

impl CredentialDiscovery {
    pub fn new(source: Arc<dyn CredentialSource>, rules: DiscoveryRules) -> Self {
        Self { source, rules }
    }

    /// Empty when nothing usable is in the jar; that is not an error here.
    pub async fn discover(&self) -> Result<Vec<String>> {
        let cookies = self.source.list_cookies(&self.rules.domain).await?;
        let candidates = rank_candidates(&cookies, &self.rules);
        info!("Found {} potential auth tokens.", candidates.len());
        Ok(candidates)
    }
}

/// Last six characters, enough to tell tokens apart in logs.
pub fn token_tail(token: &str) -> &str {
    let start = token.char_indices().rev().nth(5).map(|(i, _)| i).unwrap_or(0);
    &token[start..]
}
