// src/cookies.rs
//
// Read-only access to the browser cookie jar. The jar is either a
// Netscape-format `cookies.txt` exported from the browser or a raw
// `Cookie:` header string copied from the dev tools.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// All cookies visible for `domain` and its subdomains, in jar order.
    async fn list_cookies(&self, domain: &str) -> Result<Vec<Cookie>>;
}

fn domain_matches(cookie_domain: &str, domain: &str) -> bool {
    let cookie_domain = cookie_domain.trim_start_matches('.').to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    cookie_domain == domain || cookie_domain.ends_with(&format!(".{domain}"))
}

/// Parses the tab separated `cookies.txt` layout:
/// `domain  include_subdomains  path  secure  expiry  name  value`.
pub fn parse_netscape(contents: &str, domain: &str) -> Vec<Cookie> {
    contents
        .lines()
        .filter_map(|line| {
            // curl/browsers prefix http-only cookies with this marker
            let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                return None;
            }
            if !domain_matches(fields[0], domain) {
                return None;
            }
            Some(Cookie::new(fields[5].trim(), fields[6].trim_end_matches(['\r', '\n'])))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct CookieFileSource {
    path: PathBuf,
}

impl CookieFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialSource for CookieFileSource {
    async fn list_cookies(&self, domain: &str) -> Result<Vec<Cookie>> {
        // re-read every time: the browser rotates session cookies underneath us
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::CookieFile(format!("{}: {e}", self.path.display())))?;
        let cookies = parse_netscape(&contents, domain);
        debug!(path = %self.path.display(), count = cookies.len(), "loaded cookies");
        Ok(cookies)
    }
}

/// Fixed cookie list, e.g. from a pasted `Cookie:` header.
#[derive(Debug, Clone, Default)]
pub struct StaticCookieSource {
    cookies: Vec<Cookie>,
}

impl StaticCookieSource {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    pub fn from_header(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some(Cookie::new(name, value.trim()))
            })
            .collect();
        Self::new(cookies)
    }
}

#[async_trait]
impl CredentialSource for StaticCookieSource {
    async fn list_cookies(&self, _domain: &str) -> Result<Vec<Cookie>> {
        Ok(self.cookies.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JAR: &str = "# Netscape HTTP Cookie File\n\
.upwork.com\tTRUE\t/\tTRUE\t1999999999\toauth2_global_js_token\toauth2v2_aaa\n\
#HttpOnly_www.upwork.com\tFALSE\t/\tTRUE\t1999999999\tabc_sb\toauth2v2_bbb\n\
.example.org\tTRUE\t/\tFALSE\t0\tsession\toauth2v2_zzz\n\
broken line without tabs\n";

    #[test]
    fn netscape_parser_keeps_domain_and_http_only_cookies() {
        let cookies = parse_netscape(JAR, "upwork.com");
        assert_eq!(
            cookies,
            vec![
                Cookie::new("oauth2_global_js_token", "oauth2v2_aaa"),
                Cookie::new("abc_sb", "oauth2v2_bbb"),
            ]
        );
    }

    #[test]
    fn header_string_is_split_into_pairs() {
        let source = StaticCookieSource::from_header("a=1; b = two ;=skip; c");
        assert_eq!(source.cookies, vec![Cookie::new("a", "1"), Cookie::new("b", "two")]);
    }

    #[tokio::test]
    async fn file_source_reads_jar_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JAR.as_bytes()).unwrap();

        let source = CookieFileSource::new(file.path());
        let cookies = source.list_cookies("upwork.com").await.unwrap();
        assert_eq!(cookies.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_a_cookie_error() {
        let source = CookieFileSource::new("/definitely/not/here/cookies.txt");
        let err = source.list_cookies("upwork.com").await.unwrap_err();
        assert!(matches!(err, Error::CookieFile(_)));
    }
}
