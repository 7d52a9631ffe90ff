//! Error types for pkg-sweep
//!
//! Every per-package failure carries the package path that produced it, and
//! where a lower layer failed (datastore, network, JSON decoding) the
//! underlying cause is kept as the error source. Errors are reported on the
//! package's [`EvaluationResult`](crate::types::EvaluationResult); none of them
//! aborts a batch.

use thiserror::Error;

/// Result type alias for pkg-sweep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause produced by an external collaborator (datastore or transport)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for pkg-sweep
#[derive(Debug, Error)]
pub enum Error {
    /// The package path is not hosted on GitHub, so no remote signals exist
    #[error("[{path}] not a GitHub project")]
    NonGithubPath {
        /// Package path
        path: String,
    },

    /// The local datastore could not report the importer count
    #[error("[{path}] error retrieving import counts: {source}")]
    LocalLookupFailure {
        /// Package path
        path: String,
        /// Datastore error
        #[source]
        source: BoxError,
    },

    /// The request never produced an HTTP response
    #[error("[{path}] error retrieving information from GitHub: {source}")]
    TransportFailure {
        /// Package path
        path: String,
        /// Transport error
        #[source]
        source: BoxError,
    },

    /// 403 from the hosting API (rate limit reached)
    #[error("[{path}] rate limit reached in GitHub API")]
    Forbidden {
        /// Package path
        path: String,
    },

    /// 404 from the hosting API
    #[error("[{path}] not found in GitHub")]
    NotFound {
        /// Package path
        path: String,
    },

    /// Any status other than 200, 403 or 404
    #[error("[{path}] unexpected status code {status} from GitHub")]
    UnexpectedStatus {
        /// Package path
        path: String,
        /// HTTP status code received
        status: u16,
    },

    /// 200 response whose body could not be decoded
    #[error("[{path}] error decoding GitHub response: {source}")]
    ParseFailure {
        /// Package path
        path: String,
        /// JSON decoding error
        #[source]
        source: serde_json::Error,
    },

    /// Evaluating the package panicked, typically inside a caller-supplied
    /// transport, datastore or cache predicate
    #[error("[{path}] evaluation panicked: {message}")]
    Panicked {
        /// Package path
        path: String,
        /// Panic payload, when it was a string
        message: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },
}

/// Fieldless discriminant of [`Error`], handy for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::NonGithubPath`]
    NonGithubPath,
    /// See [`Error::LocalLookupFailure`]
    LocalLookupFailure,
    /// See [`Error::TransportFailure`]
    TransportFailure,
    /// See [`Error::Forbidden`]
    Forbidden,
    /// See [`Error::NotFound`]
    NotFound,
    /// See [`Error::UnexpectedStatus`]
    UnexpectedStatus,
    /// See [`Error::ParseFailure`]
    ParseFailure,
    /// See [`Error::Panicked`]
    Panicked,
    /// See [`Error::Config`]
    Config,
}

impl Error {
    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NonGithubPath { .. } => ErrorKind::NonGithubPath,
            Error::LocalLookupFailure { .. } => ErrorKind::LocalLookupFailure,
            Error::TransportFailure { .. } => ErrorKind::TransportFailure,
            Error::Forbidden { .. } => ErrorKind::Forbidden,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            Error::ParseFailure { .. } => ErrorKind::ParseFailure,
            Error::Panicked { .. } => ErrorKind::Panicked,
            Error::Config { .. } => ErrorKind::Config,
        }
    }

    /// Package path that originated the error, if the error is package-scoped
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::NonGithubPath { path }
            | Error::LocalLookupFailure { path, .. }
            | Error::TransportFailure { path, .. }
            | Error::Forbidden { path }
            | Error::NotFound { path }
            | Error::UnexpectedStatus { path, .. }
            | Error::ParseFailure { path, .. }
            | Error::Panicked { path, .. } => Some(path),
            Error::Config { .. } => None,
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NonGithubPath => "non_github_path",
            ErrorKind::LocalLookupFailure => "local_lookup_failure",
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::UnexpectedStatus => "unexpected_status",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::Panicked => "panicked",
            ErrorKind::Config => "config_error",
        }
    }

    /// Whether the repository client retries the request that produced this error
    ///
    /// Only `Forbidden` is retried, and only once per occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Forbidden { .. })
    }

    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
