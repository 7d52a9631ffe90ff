//! Concurrent batch evaluation
//!
//! A batch fans packages out to a fixed pool of workers sharing one
//! [`RateLimiter`] and fans results back in on a single channel:
//!
//! ```text
//! dispatcher ──► input channel ──► worker 1..N ──► output channel ──► caller
//!                                     │
//!                          rate limiter + decision rules
//! ```
//!
//! Each worker waits for a rate-limiter token before a package unless its
//! previous package was resolved without a real network call. Results arrive
//! in no particular order; the output channel closes once every worker has
//! exited. There is no cancellation: dropping the receiver makes workers stop
//! at their next send, but requests already in flight complete.

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use crate::config::EvaluatorConfig;
use crate::error::{Error, Result};
use crate::github::{CachePredicate, RepositoryClient, ReqwestTransport, Transport};
use crate::rate_limiter::RateLimiter;
use crate::rules::{DecisionRules, ImporterCounts, StaticImporterCounts};
use crate::types::{Check, EvaluationResult, Package};

/// Runs decision checks over batches of packages
///
/// # Examples
///
/// ```no_run
/// use pkg_sweep::{BatchEvaluator, EvaluatorConfig, Package};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let evaluator = BatchEvaluator::builder(EvaluatorConfig::default()).build()?;
///
/// let packages = vec![Package::new("github.com/rafaeljusto/dns")];
/// let mut results = evaluator.fast_forks(packages);
/// while let Some(result) = results.recv().await {
///     if result.decision {
///         println!("{} is a fast fork", result.path);
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BatchEvaluator {
    config: EvaluatorConfig,
    rules: DecisionRules,
}

/// Builder injecting the evaluator's collaborators
pub struct BatchEvaluatorBuilder {
    config: EvaluatorConfig,
    transport: Option<Arc<dyn Transport>>,
    importers: Option<Arc<dyn ImporterCounts>>,
    cache_predicate: Option<CachePredicate>,
}

impl BatchEvaluatorBuilder {
    /// HTTP transport (default: [`ReqwestTransport`] with the configured timeout)
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Importer-count datastore (default: every package has zero importers)
    #[must_use]
    pub fn importers(mut self, importers: Arc<dyn ImporterCounts>) -> Self {
        self.importers = Some(importers);
        self
    }

    /// Predicate recognizing responses served from a local cache (default: none)
    #[must_use]
    pub fn cache_predicate(mut self, predicate: CachePredicate) -> Self {
        self.cache_predicate = Some(predicate);
        self
    }

    /// Validate the configuration and build the evaluator
    pub fn build(self) -> Result<BatchEvaluator> {
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                ReqwestTransport::new(self.config.request_timeout).map_err(|e| Error::Config {
                    message: format!("failed to build HTTP client: {e}"),
                    key: None,
                })?,
            ),
        };
        let importers = self
            .importers
            .unwrap_or_else(|| Arc::new(StaticImporterCounts::new()));

        let client = RepositoryClient::from_config(&self.config, transport)
            .with_cache_predicate(self.cache_predicate);

        Ok(BatchEvaluator {
            rules: DecisionRules::new(client, importers),
            config: self.config,
        })
    }
}

impl BatchEvaluator {
    /// Start building an evaluator from `config`
    pub fn builder(config: EvaluatorConfig) -> BatchEvaluatorBuilder {
        BatchEvaluatorBuilder {
            config,
            transport: None,
            importers: None,
            cache_predicate: None,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Decision rules, for evaluating a single package outside a batch
    pub fn rules(&self) -> &DecisionRules {
        &self.rules
    }

    /// Combined archive-or-fast-fork decision for every package
    pub fn suppress(&self, packages: Vec<Package>) -> mpsc::Receiver<EvaluationResult> {
        self.run(Check::Suppress, packages)
    }

    /// Archive eligibility for every package
    pub fn archive(&self, packages: Vec<Package>) -> mpsc::Receiver<EvaluationResult> {
        self.run(Check::Archive, packages)
    }

    /// Fast-fork eligibility for every package
    pub fn fast_forks(&self, packages: Vec<Package>) -> mpsc::Receiver<EvaluationResult> {
        self.run(Check::FastFork, packages)
    }

    /// Run `check` over `packages`, streaming one result per package
    ///
    /// A fresh rate limiter is created for every batch. Every package yields
    /// exactly one result; a panic while evaluating a package is reported as
    /// [`Error::Panicked`] on that package's result. Must be called from within
    /// a Tokio runtime.
    pub fn run(&self, check: Check, packages: Vec<Package>) -> mpsc::Receiver<EvaluationResult> {
        let workers = self.config.workers.max(1);
        let total = packages.len();
        let limiter = RateLimiter::new(self.config.effective_rate_limit());

        tracing::info!(
            check = %check,
            packages = total,
            workers,
            "starting batch evaluation"
        );

        let (input_tx, input_rx) = mpsc::channel::<Package>(workers);
        let input_rx = Arc::new(Mutex::new(input_rx));
        let (output_tx, output_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            for package in packages {
                if input_tx.send(package).await.is_err() {
                    break;
                }
            }
        });

        let mut pool = JoinSet::new();
        for id in 0..workers {
            pool.spawn(worker(
                id,
                check,
                self.rules.clone(),
                limiter.clone(),
                input_rx.clone(),
                output_tx.clone(),
            ));
        }

        tokio::spawn(async move {
            let mut evaluated = 0;
            while let Some(joined) = pool.join_next().await {
                match joined {
                    Ok(count) => evaluated += count,
                    Err(e) => tracing::error!(error = %e, "batch worker terminated abnormally"),
                }
            }
            drop(output_tx);
            tracing::info!(
                check = %check,
                packages = total,
                evaluated,
                "batch evaluation finished"
            );
        });

        output_rx
    }

    /// Run `check` over `packages` and collect every result
    pub async fn evaluate_all(&self, check: Check, packages: Vec<Package>) -> Vec<EvaluationResult> {
        let mut results = Vec::with_capacity(packages.len());
        let mut rx = self.run(check, packages);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }
}

/// Worker loop; returns the number of packages it evaluated
async fn worker(
    id: usize,
    check: Check,
    rules: DecisionRules,
    limiter: RateLimiter,
    input: Arc<Mutex<mpsc::Receiver<Package>>>,
    output: mpsc::Sender<EvaluationResult>,
) -> usize {
    let mut should_wait = true;
    let mut evaluated = 0;

    loop {
        let next = input.lock().await.recv().await;
        let Some(package) = next else {
            break;
        };

        if should_wait {
            limiter.acquire().await;
        }

        // A panicking collaborator must still yield a result for the package
        let evaluation = tokio::spawn({
            let rules = rules.clone();
            let package = package.clone();
            async move { rules.evaluate(check, &package).await }
        });
        let result = match evaluation.await {
            Ok(result) => result,
            Err(e) => {
                let message = panic_message(e);
                tracing::error!(
                    worker = id,
                    path = %package.path,
                    error = %message,
                    "package evaluation panicked"
                );
                let error = Error::Panicked {
                    path: package.path.clone(),
                    message,
                };
                EvaluationResult::failed(package.path, error, false)
            }
        };
        should_wait = !result.cache_hit;
        evaluated += 1;

        if output.send(result).await.is_err() {
            tracing::debug!(worker = id, "result receiver dropped, stopping worker");
            break;
        }
    }

    tracing::trace!(worker = id, evaluated, "worker finished");
    evaluated
}

fn panic_message(error: tokio::task::JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string()),
        Err(error) => error.to_string(),
    }
}
