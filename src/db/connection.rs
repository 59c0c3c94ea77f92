//! Per-target connection records.
//!
//! A `Connection` holds either a constructed database client or the terminal
//! error that prevented construction or liveness. Dead connections are never
//! dispatched; their error is reported with the run's per-connection
//! failures instead.

use crate::db::{DatabaseClient, ResultSet, RunOptions};
use crate::error::{PrismaticError, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Liveness state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Liveness {
    /// Verified reachable by the last liveness check.
    Active,
    /// Constructed but not verified.
    #[default]
    Idle,
    /// A transaction is in flight.
    #[allow(dead_code)]
    Transaction,
}

/// One named target's connection handle.
pub struct Connection {
    client: Option<Box<dyn DatabaseClient>>,
    error: Option<PrismaticError>,
    state: Liveness,
}

impl Connection {
    /// Creates a connection with a constructed client.
    pub fn ready(client: Box<dyn DatabaseClient>) -> Self {
        Self {
            client: Some(client),
            error: None,
            state: Liveness::Idle,
        }
    }

    /// Creates a connection whose construction failed.
    ///
    /// The record still participates in the run so the failure is reported
    /// per connection.
    pub fn dead(error: PrismaticError) -> Self {
        Self {
            client: None,
            error: Some(error),
            state: Liveness::Idle,
        }
    }

    /// Returns the terminal error, if any.
    pub fn error(&self) -> Option<&PrismaticError> {
        self.error.as_ref()
    }

    /// Returns the client, if construction succeeded.
    pub fn client(&self) -> Option<&dyn DatabaseClient> {
        self.client.as_deref()
    }

    /// Returns the current liveness state.
    #[allow(dead_code)]
    pub fn state(&self) -> Liveness {
        self.state
    }

    /// Verifies liveness, retrying up to `max_attempts` times.
    ///
    /// Sleeps `attempt * 2` seconds between attempts to mask transient DNS
    /// and TCP errors during fleet warm-up. On final failure the terminal
    /// error is stored on the record and `false` is returned. Query failures
    /// are never retried through this path.
    pub async fn ping(&mut self, name: &str, max_attempts: u8) -> bool {
        if self.error.is_some() {
            return false;
        }
        let Some(client) = &self.client else {
            return false;
        };

        for attempt in 1..=max_attempts {
            match client.ping().await {
                Ok(()) => {
                    self.state = Liveness::Active;
                    return true;
                }
                Err(e) => {
                    warn!(
                        connection = %name,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Connection check failed"
                    );
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt) * 2)).await;
                }
            }
        }

        self.error = Some(PrismaticError::ping(format!("connection to {name} timeout")));
        false
    }

    /// Executes a query on this connection's client.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        name: &str,
        query: &str,
        options: RunOptions,
    ) -> Result<Option<ResultSet>> {
        match &self.client {
            Some(client) => client.execute(cancel, name, query, options).await,
            None => Err(PrismaticError::connect(format!(
                "connection to {name} is null"
            ))),
        }
    }

    /// Closes the underlying client, if any.
    pub async fn close(&self) {
        if let Some(client) = &self.client {
            client.close().await;
        }
    }
}
