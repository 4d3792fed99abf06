//! Code-hosting API client
//!
//! Minimal GitHub REST client for fetching repository, activity, and
//! contributor data, with `Link`-header pagination helpers.

use chrono::{DateTime, Utc};
use ohno::app_err;
use regex::Regex;
use reqwest::header::{ACCEPT, HeaderMap, LINK};
use serde::Deserialize;
use std::sync::LazyLock;

/// Media type that makes the stargazer endpoint include `starred_at`.
pub const STARGAZER_MEDIA_TYPE: &str = "application/vnd.github.v3.star+json";

/// Repository metadata with only the fields we need
#[derive(Debug, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub stargazers_count: Option<u64>,
    pub forks_count: Option<u64>,
    pub open_issues_count: Option<u64>,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One stargazer event, as returned under the star media type.
#[derive(Debug, Deserialize)]
pub struct Stargazer {
    pub starred_at: Option<DateTime<Utc>>,
}

/// Minimal pull request info from the pulls listing endpoint.
#[derive(Debug, Deserialize)]
pub struct PullSummary {
    pub created_at: Option<DateTime<Utc>>,
}

/// Minimal issue info from the issues listing endpoint.
///
/// The issues endpoint also returns pull requests; those carry a
/// `pull_request` marker object and must be filtered out for issue counts.
#[derive(Debug, Deserialize)]
pub struct IssueSummary {
    pub created_at: Option<DateTime<Utc>>,
    pub pull_request: Option<serde::de::IgnoredAny>,
}

impl IssueSummary {
    /// Whether this item is a pull request rather than an issue.
    #[must_use]
    pub const fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// One entry of the contributors listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ContributorSummary {
    pub login: Option<String>,
    #[serde(default)]
    pub contributions: u64,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

/// User detail, fetched to resolve a contributor's display name.
#[derive(Debug, Deserialize)]
pub struct User {
    pub name: Option<String>,
}

/// Hosting API client
#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Create a new hosting API client with optional authentication token and base URL
    pub fn new(token: Option<&str>, base_url: impl Into<String>) -> crate::Result<Self> {
        use reqwest::header::{AUTHORIZATION, HeaderValue};

        let mut client_builder = reqwest::Client::builder().user_agent(super::super::USER_AGENT);

        if let Some(t) = token {
            let mut auth_val = HeaderValue::from_str(&format!("token {t}"))?;
            auth_val.set_sensitive(true);

            let mut headers = HeaderMap::new();
            let _ = headers.insert(AUTHORIZATION, auth_val);

            client_builder = client_builder.default_headers(headers);
        }

        Ok(Self {
            client: client_builder.build()?,
            base_url: base_url.into(),
        })
    }

    /// Get the base URL for this client
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET request, turning non-2xx statuses into errors.
    pub async fn get(&self, url: &str, accept: Option<&str>) -> crate::Result<reqwest::Response> {
        let mut request = self.client.get(url);
        if let Some(media_type) = accept {
            request = request.header(ACCEPT, media_type);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(app_err!("GET {url} returned HTTP {status}"));
        }

        Ok(resp)
    }

    /// GET a URL and deserialize the JSON body.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> crate::Result<T> {
        Ok(self.get(url, None).await?.json().await?)
    }

    /// GET a URL with an explicit media type and deserialize the JSON body.
    pub async fn get_json_with_accept<T: serde::de::DeserializeOwned>(&self, url: &str, accept: &str) -> crate::Result<T> {
        Ok(self.get(url, Some(accept)).await?.json().await?)
    }
}

/// Whether a login belongs to an automation account, by suffix convention.
#[must_use]
pub fn is_bot_login(login: &str) -> bool {
    login.ends_with("[bot]") || login.ends_with("-bot")
}

static LAST_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"page=(\d+)>; rel="last""#).expect("pattern is valid"));

/// Total item count of a `per_page=1` probe, taken from the `Link` header's
/// `rel="last"` page number. Absent header means a single page.
#[must_use]
pub fn count_from_link_header(headers: &HeaderMap) -> u64 {
    headers
        .get(LINK)
        .and_then(|h| h.to_str().ok())
        .and_then(|link| LAST_PAGE_RE.captures(link))
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}
