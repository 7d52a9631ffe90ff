//! Core types for pkg-sweep

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A tracked package, identified by its import path
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    /// Import path (e.g. "github.com/owner/repo/sub/pkg")
    pub path: String,
}

impl Package {
    /// Create a package from its import path
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl From<&str> for Package {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for Package {
    fn from(path: String) -> Self {
        Self { path }
    }
}

/// Repository metadata from `GET /repos/{owner}/{repo}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Repository creation time
    pub created_at: DateTime<Utc>,
    /// Last update time; absent means the repository never reported one
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Whether the repository is a fork
    #[serde(rename = "fork", default)]
    pub is_fork: bool,
}

/// A single entry of the repository commit history
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitRecord {
    /// Author date of the commit
    pub author_date: DateTime<Utc>,
}

/// Which decision a batch computes for every package
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Archive eligibility only
    Archive,
    /// Fast-fork eligibility only (no datastore lookup)
    FastFork,
    /// Archive-eligible OR fast-fork-eligible (default)
    #[default]
    Suppress,
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Check::Archive => "archive",
            Check::FastFork => "fast_fork",
            Check::Suppress => "suppress",
        };
        f.write_str(name)
    }
}

/// Outcome of evaluating a single package
///
/// Exactly one is produced per input package. `decision` is meaningful only
/// when `error` is `None`.
#[derive(Debug)]
pub struct EvaluationResult {
    /// Package path
    pub path: String,
    /// Whether the package should be archived/suppressed
    pub decision: bool,
    /// True when no rate-limited network round-trip was consumed
    pub cache_hit: bool,
    /// Failure that prevented a decision
    pub error: Option<Error>,
}

impl EvaluationResult {
    pub(crate) fn decided(path: impl Into<String>, decision: bool, cache_hit: bool) -> Self {
        Self {
            path: path.into(),
            decision,
            cache_hit,
            error: None,
        }
    }

    pub(crate) fn failed(path: impl Into<String>, error: Error, cache_hit: bool) -> Self {
        Self {
            path: path.into(),
            decision: false,
            cache_hit,
            error: Some(error),
        }
    }

    /// True if a decision was reached
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
