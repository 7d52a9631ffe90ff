//! Shared fakes for unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::BoxError;
use crate::github::{Transport, TransportResponse};
use crate::rules::ImporterCounts;

type Handler = dyn Fn(&str) -> Result<TransportResponse, String> + Send + Sync;

/// Transport answering every request through a closure, recording the URLs
pub(crate) struct FnTransport {
    handler: Box<Handler>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FnTransport {
    pub(crate) fn new(
        handler: impl Fn(&str) -> Result<TransportResponse, String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    /// Answers repository and commit requests with fixed bodies
    pub(crate) fn github(repo_body: String, commits_body: String) -> Arc<Self> {
        Self::new(move |url| {
            let body = if is_commits_url(url) {
                &commits_body
            } else {
                &repo_body
            };
            Ok(TransportResponse::new(StatusCode::OK).with_body(body.clone()))
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub(crate) fn commit_calls(&self) -> usize {
        self.urls().iter().filter(|u| is_commits_url(u)).count()
    }
}

#[async_trait]
impl Transport for FnTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        (self.handler)(url).map_err(BoxError::from)
    }
}

pub(crate) fn is_commits_url(url: &str) -> bool {
    url.split('?').next().unwrap_or_default().ends_with("/commits")
}

/// Datastore whose lookups always fail
pub(crate) struct FailingImporterCounts;

#[async_trait]
impl ImporterCounts for FailingImporterCounts {
    async fn importer_count(&self, _path: &str) -> Result<u64, BoxError> {
        Err("database unavailable".into())
    }
}

pub(crate) fn created_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2010-08-03T21:56:23Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub(crate) fn repo_json(
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    fork: bool,
) -> String {
    serde_json::json!({
        "created_at": created_at.to_rfc3339(),
        "updated_at": updated_at.to_rfc3339(),
        "fork": fork,
        "stargazers_count": 1133,
    })
    .to_string()
}

pub(crate) fn commits_json(dates: &[DateTime<Utc>]) -> String {
    let entries: Vec<_> = dates
        .iter()
        .map(|d| serde_json::json!({"commit": {"author": {"date": d.to_rfc3339()}}}))
        .collect();
    serde_json::Value::Array(entries).to_string()
}
