//! Archive and fast-fork decision rules
//!
//! The threshold checks are pure functions over already-fetched metadata.
//! [`DecisionRules`] wires them to the importer-count datastore and the
//! repository client, fetching only what each decision needs.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BoxError, Error, ErrorKind, Result};
use crate::github::{Fetched, RepositoryClient};
use crate::types::{Check, CommitRecord, EvaluationResult, Package, RepositoryInfo};

/// Days without updates after which an unreferenced repository is considered unused
pub const ARCHIVE_AFTER_DAYS: i64 = 730;

/// Days after creation within which a fast fork's whole history must fall
pub const FAST_FORK_WINDOW_DAYS: i64 = 7;

/// Maximum commits after creation for a fork to still count as a fast fork
pub const FAST_FORK_MAX_COMMITS: usize = 2;

/// Source of importer counts (how many other packages import a path)
#[async_trait]
pub trait ImporterCounts: Send + Sync {
    /// Number of packages importing `path`
    async fn importer_count(&self, path: &str) -> std::result::Result<u64, BoxError>;
}

/// In-memory importer counts; unknown paths have no importers
#[derive(Clone, Debug, Default)]
pub struct StaticImporterCounts {
    counts: HashMap<String, u64>,
}

impl StaticImporterCounts {
    /// Empty datastore
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count for `path`
    pub fn insert(&mut self, path: impl Into<String>, count: u64) {
        self.counts.insert(path.into(), count);
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for StaticImporterCounts {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().map(|(p, c)| (p.into(), c)).collect(),
        }
    }
}

#[async_trait]
impl ImporterCounts for StaticImporterCounts {
    async fn importer_count(&self, path: &str) -> std::result::Result<u64, BoxError> {
        Ok(self.counts.get(path).copied().unwrap_or(0))
    }
}

/// True if the repository has gone at least [`ARCHIVE_AFTER_DAYS`] without updates
///
/// A plain elapsed-duration comparison; no calendar-year arithmetic.
pub fn is_archive_eligible(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(updated_at) >= TimeDelta::days(ARCHIVE_AFTER_DAYS)
}

/// True if a fork's history marks it as created only to carry a single change
///
/// Any commit authored later than a week after creation disqualifies the fork.
/// Otherwise at most [`FAST_FORK_MAX_COMMITS`] commits may postdate creation.
pub fn is_fast_fork_history(created_at: DateTime<Utc>, commits: &[CommitRecord]) -> bool {
    let window_end = created_at + TimeDelta::days(FAST_FORK_WINDOW_DAYS);

    let mut after_creation = 0;
    for commit in commits {
        if commit.author_date > window_end {
            return false;
        }
        if commit.author_date > created_at {
            after_creation += 1;
        }
    }

    after_creation <= FAST_FORK_MAX_COMMITS
}

/// Per-package decision logic backed by the datastore and the repository client
#[derive(Clone)]
pub struct DecisionRules {
    client: RepositoryClient,
    importers: Arc<dyn ImporterCounts>,
}

impl std::fmt::Debug for DecisionRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionRules")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl DecisionRules {
    /// Build the rules from a client and an importer-count source
    pub fn new(client: RepositoryClient, importers: Arc<dyn ImporterCounts>) -> Self {
        Self { client, importers }
    }

    /// Run `check` for `package`
    pub async fn evaluate(&self, check: Check, package: &Package) -> EvaluationResult {
        let result = match check {
            Check::Archive => self.should_archive(&package.path).await,
            Check::FastFork => self.is_fast_fork(&package.path).await,
            Check::Suppress => self.should_suppress(&package.path).await,
        };

        match &result.error {
            None => tracing::debug!(
                path = %result.path,
                check = %check,
                decision = result.decision,
                cache_hit = result.cache_hit,
                "package evaluated"
            ),
            Some(e) => tracing::debug!(
                path = %result.path,
                check = %check,
                error = %e,
                "package evaluation failed"
            ),
        }

        result
    }

    /// Archive eligibility: unreferenced and not updated for two years
    pub async fn should_archive(&self, path: &str) -> EvaluationResult {
        if let Err(e) = RepositoryClient::normalize_path(path) {
            return EvaluationResult::failed(path, e, true);
        }

        match self.is_referenced(path).await {
            Err(e) => return EvaluationResult::failed(path, e, true),
            Ok(true) => return EvaluationResult::decided(path, false, true),
            Ok(false) => {}
        }

        match self.client.repository(path).await {
            Ok(Fetched { value, cache_hit }) => EvaluationResult::decided(
                path,
                is_stale(&value, Utc::now()),
                cache_hit,
            ),
            Err(e) => failed_fetch(path, e),
        }
    }

    /// Fast-fork eligibility, without consulting the datastore
    pub async fn is_fast_fork(&self, path: &str) -> EvaluationResult {
        let info = match self.client.repository(path).await {
            Ok(info) => info,
            Err(e) => return failed_fetch(path, e),
        };

        match self.fast_fork_from(path, &info.value).await {
            Ok(fast_fork) => EvaluationResult::decided(
                path,
                fast_fork.value,
                info.cache_hit && fast_fork.cache_hit,
            ),
            Err(e) => failed_fetch(path, e),
        }
    }

    /// Combined decision: archive-eligible or fast-fork-eligible
    ///
    /// Repository metadata is fetched once and reused by both checks.
    pub async fn should_suppress(&self, path: &str) -> EvaluationResult {
        if let Err(e) = RepositoryClient::normalize_path(path) {
            return EvaluationResult::failed(path, e, true);
        }

        match self.is_referenced(path).await {
            Err(e) => return EvaluationResult::failed(path, e, true),
            Ok(true) => return EvaluationResult::decided(path, false, true),
            Ok(false) => {}
        }

        let info = match self.client.repository(path).await {
            Ok(info) => info,
            Err(e) => return failed_fetch(path, e),
        };

        if is_stale(&info.value, Utc::now()) {
            return EvaluationResult::decided(path, true, info.cache_hit);
        }

        match self.fast_fork_from(path, &info.value).await {
            Ok(fast_fork) => EvaluationResult::decided(
                path,
                fast_fork.value,
                info.cache_hit && fast_fork.cache_hit,
            ),
            Err(e) => failed_fetch(path, e),
        }
    }

    async fn is_referenced(&self, path: &str) -> Result<bool> {
        let count = self
            .importers
            .importer_count(path)
            .await
            .map_err(|source| Error::LocalLookupFailure {
                path: path.to_string(),
                source,
            })?;
        Ok(count > 0)
    }

    /// Fast-fork check on already-fetched metadata; commits are fetched only for forks
    async fn fast_fork_from(&self, path: &str, info: &RepositoryInfo) -> Result<Fetched<bool>> {
        if !info.is_fork {
            return Ok(Fetched {
                value: false,
                cache_hit: true,
            });
        }

        let commits = self.client.commits(path, info.created_at).await?;
        Ok(Fetched {
            value: is_fast_fork_history(info.created_at, &commits.value),
            cache_hit: commits.cache_hit,
        })
    }
}

/// A repository that never reported an update time counts as stale
fn is_stale(info: &RepositoryInfo, now: DateTime<Utc>) -> bool {
    info.updated_at
        .is_none_or(|updated_at| is_archive_eligible(updated_at, now))
}

/// A failed fetch consumed a network call unless the path was rejected up front
fn failed_fetch(path: &str, error: Error) -> EvaluationResult {
    let cache_hit = error.kind() == ErrorKind::NonGithubPath;
    EvaluationResult::failed(path, error, cache_hit)
}
