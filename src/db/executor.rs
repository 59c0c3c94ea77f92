//! Parallel multi-connection query execution.
//!
//! Dispatches one task per connection, bounded by a worker-budget semaphore,
//! and collects every outcome through a result channel. Per-connection
//! failures are collected, never raised; a failing connection never cancels
//! or affects its peers, and the executor always completes.

use crate::db::classify::{classify, QueryType};
use crate::db::{CommandKind, Manager, QueryCache, ResultSet, RunOptions};
use crate::error::PrismaticError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Counts of per-connection outcomes for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub successful: usize,
    pub failed: usize,
}

/// The consolidated outcome of one run.
///
/// `results` and `errors` are disjoint; every dispatched connection appears
/// in the summary counts, but `run`-command successes carry no result set
/// and therefore appear in neither map.
pub struct RunOutcome {
    pub results: HashMap<String, ResultSet>,
    pub errors: HashMap<String, PrismaticError>,
    pub summary: Summary,
}

/// The fan-out engine.
pub struct Executor<'a> {
    manager: &'a Manager,
    cache: Option<Arc<QueryCache>>,
}

impl<'a> Executor<'a> {
    /// Creates an executor over the manager's connections.
    pub fn new(manager: &'a Manager) -> Self {
        Self {
            manager,
            cache: None,
        }
    }

    /// Creates an executor that may serve repeated DQL exports from a cache.
    pub fn with_cache(manager: &'a Manager, cache: Arc<QueryCache>) -> Self {
        Self {
            manager,
            cache: Some(cache),
        }
    }

    /// Executes a query on every managed connection in parallel.
    ///
    /// At most `workers` executions are in flight at once. An empty `subset`
    /// dispatches to every connection; otherwise only the named ones.
    /// Cancelling `cancel` aborts in-flight executions; already collected
    /// outcomes are kept.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        workers: u8,
        query: &str,
        options: RunOptions,
        subset: &[String],
    ) -> RunOutcome {
        let query_type = match classify(query) {
            Ok(qt) => {
                info!(query_type = %qt, "Identified query type");
                Some(qt)
            }
            Err(e) => {
                warn!(error = %e, "Unable to identify query type");
                None
            }
        };

        if options.command == CommandKind::Run && matches!(query_type, Some(QueryType::Dql)) {
            warn!("Running SELECT without saving the results");
        }

        let cacheable = options.use_cache
            && options.command == CommandKind::Export
            && matches!(query_type, Some(QueryType::Dql));

        let capacity = self.manager.len().max(1);
        let (results_tx, mut results_rx) = mpsc::channel(capacity);
        let semaphore = Arc::new(Semaphore::new(usize::from(workers.max(1))));

        let mut dispatched = 0usize;
        for (name, connection) in self.manager.connections() {
            if !subset.is_empty() && !subset.iter().any(|s| s == name) {
                continue;
            }
            dispatched += 1;

            let name = name.clone();
            let connection = Arc::clone(connection);
            let query = query.to_string();
            let cancel = cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            let cache = if cacheable { self.cache.clone() } else { None };
            let results_tx = results_tx.clone();

            tokio::spawn(async move {
                // Held for the task's whole lifetime; released on every exit
                // path, panics included.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("executor semaphore closed");

                if let Some(err) = connection.error() {
                    error!(connection = %name, error = %err, "Skipping connection due to earlier failure");
                    let _ = results_tx.send((name, Err(err.clone()))).await;
                    return;
                }

                if connection.client().is_none() {
                    warn!(connection = %name, "Connection has no database handle");
                    let err =
                        PrismaticError::connect(format!("connection to {name} is null"));
                    let _ = results_tx.send((name, Err(err))).await;
                    return;
                }

                if let Some(cache) = &cache {
                    if let Some(hit) = cache.get(&name, &query) {
                        info!(connection = %name, "Query served from cache");
                        let _ = results_tx.send((name, Ok(Some(hit)))).await;
                        return;
                    }
                }

                info!(connection = %name, "Running query");
                let result = connection.execute(&cancel, &name, &query, options).await;

                if let (Some(cache), Ok(Some(result_set))) = (&cache, &result) {
                    cache.set(&name, &query, result_set.clone());
                }

                let _ = results_tx.send((name, result)).await;
            });
        }

        // Dropping the local sender closes the channel once every dispatched
        // task has sent its outcome.
        drop(results_tx);

        let mut results = HashMap::new();
        let mut errors = HashMap::new();
        let mut summary = Summary::default();

        while let Some((name, outcome)) = results_rx.recv().await {
            match outcome {
                Ok(result_set) => {
                    info!(connection = %name, "Query successful");
                    summary.successful += 1;
                    if let Some(result_set) = result_set {
                        results.insert(name, result_set);
                    }
                }
                Err(e) => {
                    error!(connection = %name, error = %e, "Query failed");
                    summary.failed += 1;
                    errors.insert(name, e);
                }
            }
        }

        debug_assert_eq!(summary.successful + summary.failed, dispatched);

        let line = format!(
            "Query summary: {} successful, {} failed",
            summary.successful, summary.failed
        );
        info!("{line}");
        println!("{line}");

        RunOutcome {
            results,
            errors,
            summary,
        }
    }
}
