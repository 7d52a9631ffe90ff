//! Common test utilities for pkg-sweep integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use pkg_sweep::{BatchEvaluator, EvaluatorConfig, RateLimitConfig};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creation time shared by every fake repository
pub fn created_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2014-03-01T12:00:00Z")
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Repository metadata body as the hosting API returns it
pub fn repo_body(updated_days_ago: i64, fork: bool) -> serde_json::Value {
    serde_json::json!({
        "full_name": "owner/repo",
        "created_at": created_at().to_rfc3339(),
        "updated_at": (Utc::now() - TimeDelta::days(updated_days_ago)).to_rfc3339(),
        "fork": fork,
    })
}

/// Commit listing with one entry per offset from [`created_at`]
pub fn commits_body(offsets: &[TimeDelta]) -> serde_json::Value {
    let entries: Vec<_> = offsets
        .iter()
        .map(|offset| {
            serde_json::json!({
                "sha": "0000000000000000000000000000000000000000",
                "commit": { "author": { "date": (created_at() + *offset).to_rfc3339() } }
            })
        })
        .collect();
    serde_json::Value::Array(entries)
}

/// Fake repository served by [`mount_repo`]
pub struct FakeRepo<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub updated_days_ago: i64,
    pub fork: bool,
    pub commit_offsets: &'a [TimeDelta],
}

/// Serve metadata and commits for one repository
pub async fn mount_repo(server: &MockServer, repo: &FakeRepo<'_>) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}", repo.owner, repo.name)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(repo_body(repo.updated_days_ago, repo.fork)),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/commits", repo.owner, repo.name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(commits_body(repo.commit_offsets)))
        .mount(server)
        .await;
}

/// Configuration pointing at a mock server with a permissive rate limit
pub fn mock_config(server: &MockServer, workers: usize) -> EvaluatorConfig {
    EvaluatorConfig {
        workers,
        api_base_url: server.uri(),
        forbidden_backoff: Duration::from_millis(20),
        request_timeout: Duration::from_secs(5),
        rate_limit: Some(RateLimitConfig {
            capacity: 100,
            interval: Duration::from_millis(1),
        }),
        ..Default::default()
    }
}

/// Evaluator against a mock server using the default reqwest transport
pub fn mock_evaluator(server: &MockServer, workers: usize) -> BatchEvaluator {
    match BatchEvaluator::builder(mock_config(server, workers)).build() {
        Ok(evaluator) => evaluator,
        Err(e) => panic!("failed to build evaluator: {e}"),
    }
}
