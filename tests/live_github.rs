//! Tests against the real GitHub API
//!
//! These use OAuth application credentials from `.env` and are only compiled
//! with the `live-tests` feature so normal CI never hits the network.
//!
//! # Running the tests
//!
//! ```bash
//! cargo test --features live-tests --test live_github -- --nocapture
//! ```
//!
//! # Environment variables (.env file)
//!
//! - `GITHUB_CLIENT_ID` - OAuth application client id (optional)
//! - `GITHUB_CLIENT_SECRET` - OAuth application client secret (optional)
//!
//! Without credentials the unauthenticated tier is used, which allows a single
//! request per minute, so each test keeps its request count small.

#![cfg(feature = "live-tests")]

use pkg_sweep::{BatchEvaluator, Check, ErrorKind, EvaluatorConfig, GithubAuth, Package};

fn load_auth() -> Option<GithubAuth> {
    dotenvy::dotenv().ok();
    GithubAuth::from_env()
}

fn live_evaluator() -> BatchEvaluator {
    let auth = load_auth();
    if auth.is_none() {
        eprintln!("GITHUB_CLIENT_ID/GITHUB_CLIENT_SECRET not set, using unauthenticated tier");
    }

    let config = EvaluatorConfig {
        workers: 2,
        auth,
        ..Default::default()
    };
    BatchEvaluator::builder(config)
        .build()
        .expect("live evaluator should build")
}

/// A long-lived, actively maintained repository is neither archived nor a fast fork
#[tokio::test]
async fn test_active_repository_is_kept() {
    let evaluator = live_evaluator();

    let results = evaluator
        .evaluate_all(Check::Suppress, vec![Package::new("github.com/golang/go")])
        .await;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    match &result.error {
        Some(e) if e.kind() == ErrorKind::Forbidden => {
            eprintln!("Skipping: rate limit exhausted ({e})");
        }
        Some(e) => panic!("unexpected error: {e}"),
        None => assert!(!result.decision, "golang/go should not be suppressed"),
    }
}

/// A repository that does not exist is reported as not found
#[tokio::test]
async fn test_missing_repository_is_not_found() {
    let evaluator = live_evaluator();

    let results = evaluator
        .evaluate_all(
            Check::Archive,
            vec![Package::new(
                "github.com/pkg-sweep-nonexistent-owner/pkg-sweep-nonexistent-repo",
            )],
        )
        .await;

    assert_eq!(results.len(), 1);
    let err = results[0].error.as_ref().expect("missing repo should fail");
    assert!(
        matches!(err.kind(), ErrorKind::NotFound | ErrorKind::Forbidden),
        "unexpected error kind: {err}"
    );
}
