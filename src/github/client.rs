//! Repository metadata and commit history fetching
//!
//! Every fetch is classified into success or one of the package-scoped
//! [`Error`] kinds. A 403 is retried once after sleeping until the reset
//! time announced by the API (or a fixed backoff when no reset is announced).

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::transport::{CachePredicate, Transport, TransportResponse};
use crate::config::{DEFAULT_API_BASE_URL, EvaluatorConfig, GithubAuth};
use crate::error::{Error, Result};
use crate::types::{CommitRecord, RepositoryInfo};

/// Import path prefix of packages hosted on GitHub
pub const HOSTING_PREFIX: &str = "github.com/";

/// Header carrying the epoch second at which the rate limit window resets
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Retries granted to a request answered with 403
const FORBIDDEN_RETRIES: u32 = 1;

/// Value fetched from the API plus whether it came from a local cache
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fetched<T> {
    /// Decoded payload
    pub value: T,
    /// True when the transport served the response from a cache
    pub cache_hit: bool,
}

// Wire shape of a `GET /repos/{owner}/{repo}/commits` entry
#[derive(Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    author: CommitAuthor,
}

#[derive(Deserialize)]
struct CommitAuthor {
    date: DateTime<Utc>,
}

/// Client for the hosting API's repository endpoints
#[derive(Clone)]
pub struct RepositoryClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    auth: Option<GithubAuth>,
    is_cache_hit: Option<CachePredicate>,
    forbidden_backoff: Duration,
}

impl std::fmt::Debug for RepositoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.auth.is_some())
            .field("cache_predicate", &self.is_cache_hit.is_some())
            .field("forbidden_backoff", &self.forbidden_backoff)
            .finish()
    }
}

impl RepositoryClient {
    /// Client against the public API with no credentials and no cache predicate
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            auth: None,
            is_cache_hit: None,
            forbidden_backoff: Duration::from_secs(60),
        }
    }

    /// Client configured from the evaluator settings
    pub fn from_config(config: &EvaluatorConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(transport)
            .with_base_url(&config.api_base_url)
            .with_auth(config.auth.clone())
            .with_forbidden_backoff(config.forbidden_backoff)
    }

    /// Use another API endpoint
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Send credentials with every request
    #[must_use]
    pub fn with_auth(mut self, auth: Option<GithubAuth>) -> Self {
        self.auth = auth;
        self
    }

    /// Recognize cached responses with `predicate`
    #[must_use]
    pub fn with_cache_predicate(mut self, predicate: Option<CachePredicate>) -> Self {
        self.is_cache_hit = predicate;
        self
    }

    /// Wait used before retrying a 403 without reset header
    #[must_use]
    pub fn with_forbidden_backoff(mut self, backoff: Duration) -> Self {
        self.forbidden_backoff = backoff;
        self
    }

    /// Reduce a package path to the `owner/repo` identity of its repository
    ///
    /// Sub-packages resolve to the same identity as their repository root.
    ///
    /// ```
    /// use pkg_sweep::github::RepositoryClient;
    ///
    /// let id = RepositoryClient::normalize_path("github.com/rafaeljusto/gddoexp/cmd/gddoexp");
    /// assert_eq!(id.unwrap(), "rafaeljusto/gddoexp");
    /// assert!(RepositoryClient::normalize_path("golang.org/x/net").is_err());
    /// ```
    pub fn normalize_path(path: &str) -> Result<String> {
        let non_github = || Error::NonGithubPath {
            path: path.to_string(),
        };

        let rest = path.strip_prefix(HOSTING_PREFIX).ok_or_else(non_github)?;
        let mut segments = rest.split('/');
        match (segments.next(), segments.next()) {
            (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
                Ok(format!("{owner}/{repo}"))
            }
            _ => Err(non_github()),
        }
    }

    /// URL of the repository metadata endpoint for `path`
    pub fn repository_url(&self, path: &str) -> Result<Url> {
        let repo = Self::normalize_path(path)?;
        self.build_url(path, &format!("repos/{repo}"), &[])
    }

    /// URL of the commit list endpoint for `path`, starting at `since`
    pub fn commits_url(&self, path: &str, since: DateTime<Utc>) -> Result<Url> {
        let repo = Self::normalize_path(path)?;
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.build_url(path, &format!("repos/{repo}/commits"), &[("since", &since)])
    }

    /// Fetch repository metadata
    pub async fn repository(&self, path: &str) -> Result<Fetched<RepositoryInfo>> {
        let url = self.repository_url(path)?;
        self.fetch_json(path, &url).await
    }

    /// Fetch the commits authored since `since` (normally the repository creation)
    pub async fn commits(
        &self,
        path: &str,
        since: DateTime<Utc>,
    ) -> Result<Fetched<Vec<CommitRecord>>> {
        let url = self.commits_url(path, since)?;
        let fetched: Fetched<Vec<CommitEntry>> = self.fetch_json(path, &url).await?;
        Ok(Fetched {
            value: fetched
                .value
                .into_iter()
                .map(|entry| CommitRecord {
                    author_date: entry.commit.author.date,
                })
                .collect(),
            cache_hit: fetched.cache_hit,
        })
    }

    fn build_url(&self, path: &str, endpoint: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{endpoint}", self.base_url)).map_err(|e| {
            Error::TransportFailure {
                path: path.to_string(),
                source: Box::new(e),
            }
        })?;

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            if let Some(auth) = &self.auth {
                query
                    .append_pair("client_id", &auth.id)
                    .append_pair("client_secret", &auth.secret);
            }
        }

        // Drop the dangling "?" left when no pairs were appended
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str, url: &Url) -> Result<Fetched<T>> {
        let mut retries_left = FORBIDDEN_RETRIES;

        loop {
            tracing::debug!(path = %path, endpoint = %url.path(), "querying GitHub API");

            let response =
                self.transport
                    .get(url.as_str())
                    .await
                    .map_err(|source| Error::TransportFailure {
                        path: path.to_string(),
                        source,
                    })?;

            match response.status {
                StatusCode::OK => {}
                StatusCode::FORBIDDEN if retries_left > 0 => {
                    retries_left -= 1;
                    let wait = self.forbidden_wait(&response);
                    tracing::warn!(
                        path = %path,
                        wait_ms = wait.as_millis() as u64,
                        "GitHub rate limit reached, retrying after wait"
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                StatusCode::FORBIDDEN => {
                    return Err(Error::Forbidden {
                        path: path.to_string(),
                    });
                }
                StatusCode::NOT_FOUND => {
                    return Err(Error::NotFound {
                        path: path.to_string(),
                    });
                }
                status => {
                    return Err(Error::UnexpectedStatus {
                        path: path.to_string(),
                        status: status.as_u16(),
                    });
                }
            }

            let value = serde_json::from_slice(&response.body).map_err(|source| {
                Error::ParseFailure {
                    path: path.to_string(),
                    source,
                }
            })?;

            let cache_hit = self
                .is_cache_hit
                .as_ref()
                .is_some_and(|is_cache_hit| is_cache_hit(&response));

            return Ok(Fetched { value, cache_hit });
        }
    }

    /// How long to wait before retrying a 403
    fn forbidden_wait(&self, response: &TransportResponse) -> Duration {
        match response
            .header(RATE_LIMIT_RESET_HEADER)
            .and_then(parse_reset)
        {
            Some(reset) => (reset - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            None => self.forbidden_backoff,
        }
    }
}

/// Parse an epoch-seconds reset value; fractional seconds are accepted
fn parse_reset(value: &str) -> Option<DateTime<Utc>> {
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}
