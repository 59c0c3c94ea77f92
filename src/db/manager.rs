//! Connection manager for database lifecycle.
//!
//! Owns the mapping from connection name to `Connection`, constructs handles
//! from configuration, runs the initial liveness checks in parallel, and
//! releases every handle on shutdown.

use crate::config::Config;
use crate::db::{self, Connection, Engine};
use crate::error::PrismaticError;
use futures::{stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Manages the fleet's database connections.
#[derive(Default)]
pub struct Manager {
    connections: HashMap<String, Arc<Connection>>,
}

impl Manager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager from pre-built connections.
    ///
    /// This is primarily useful for testing with mock clients.
    pub fn from_connections(connections: HashMap<String, Connection>) -> Self {
        Self {
            connections: connections
                .into_iter()
                .map(|(name, conn)| (name, Arc::new(conn)))
                .collect(),
        }
    }

    /// Returns the connection with the given name.
    pub fn get(&self, name: &str) -> Option<&Arc<Connection>> {
        self.connections.get(name)
    }

    /// Returns all managed connections.
    pub fn connections(&self) -> &HashMap<String, Arc<Connection>> {
        &self.connections
    }

    /// Returns the number of managed connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are managed.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Loads connections from the configuration for the selected environment.
    ///
    /// Targets without an entry for the environment are skipped silently;
    /// disabled environments are logged and skipped. Handle construction
    /// errors are captured on the connection record rather than raised, so
    /// the executor can report every target's outcome uniformly.
    ///
    /// Liveness checks run in parallel, bounded by `max_workers`, for every
    /// constructed connection that is not excluded by the subset filter.
    pub async fn load(&mut self, cfg: &Config, environment: &str, subset: &[String]) {
        let mut connections: HashMap<String, Connection> = HashMap::new();

        for (name, target) in &cfg.connections {
            let Some(engine) = Engine::parse(&target.engine) else {
                debug!(connection = %name, engine = %target.engine, "Skipping unsupported engine");
                continue;
            };

            let Some(env) = target.resolve_environment(environment) else {
                continue;
            };
            if env.disabled {
                warn!(connection = %name, environment = %environment, "Environment disabled, skipping");
                continue;
            }

            let connection = match db::connect(engine, &env.dsn(), cfg) {
                Ok(client) => Connection::ready(client),
                Err(e) => Connection::dead(PrismaticError::connect(format!(
                    "unable to connect to {}: {e}",
                    env.host
                ))),
            };
            connections.insert(name.clone(), connection);
        }

        let max_retries = cfg.max_retries;
        let checks: Vec<_> = connections
            .iter_mut()
            .filter(|(name, _)| subset.is_empty() || subset.iter().any(|s| s == *name))
            .map(|(name, connection)| async move {
                connection.ping(name, max_retries).await;
            })
            .collect();

        stream::iter(checks)
            .buffer_unordered(usize::from(cfg.max_workers.max(1)))
            .collect::<Vec<()>>()
            .await;

        self.connections = connections
            .into_iter()
            .map(|(name, conn)| (name, Arc::new(conn)))
            .collect();
    }

    /// Closes every connection with a live handle.
    pub async fn close(&self) {
        for connection in self.connections.values() {
            connection.close().await;
        }
    }
}
