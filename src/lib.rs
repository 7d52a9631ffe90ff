//! # pkg-sweep
//!
//! Batch evaluation of package-index entries against their GitHub
//! repositories, deciding which packages should be hidden from listings.
//!
//! ## Checks
//!
//! - **Archive** - the repository has not been updated in two years and no
//!   indexed package imports it
//! - **Fast fork** - the repository is a fork that received at most two
//!   commits within a week of being created, and nothing imports it
//! - **Suppress** - either of the above
//!
//! Packages are evaluated concurrently by a worker pool sharing one
//! token-bucket rate limiter, and results stream back on a channel as soon
//! as each one is ready.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pkg_sweep::{BatchEvaluator, EvaluatorConfig, GithubAuth, Package};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EvaluatorConfig {
//!         workers: 16,
//!         auth: Some(GithubAuth::new("client-id", "client-secret")),
//!         ..Default::default()
//!     };
//!     let evaluator = BatchEvaluator::builder(config).build()?;
//!
//!     let packages = vec![
//!         Package::new("github.com/golang/example/hello"),
//!         Package::new("gopkg.in/yaml.v2"),
//!     ];
//!
//!     let mut results = evaluator.suppress(packages);
//!     while let Some(result) = results.recv().await {
//!         match result.error {
//!             Some(e) => eprintln!("{e}"),
//!             None => println!("{} suppress={}", result.path, result.decision),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Concurrent batch evaluation
pub mod evaluator;
/// GitHub REST client and HTTP transport
pub mod github;
/// Token-bucket rate limiting
pub mod rate_limiter;
/// Archive and fast-fork decision rules
pub mod rules;
/// Core domain types
pub mod types;

#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use config::{EvaluatorConfig, GithubAuth, RateLimitConfig};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use evaluator::{BatchEvaluator, BatchEvaluatorBuilder};
pub use github::{CachePredicate, RepositoryClient, ReqwestTransport, Transport, TransportResponse};
pub use rate_limiter::RateLimiter;
pub use rules::{DecisionRules, ImporterCounts, StaticImporterCounts};
pub use types::{Check, CommitRecord, EvaluationResult, Package, RepositoryInfo};
