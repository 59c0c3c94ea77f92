//! Error types for Prismatic.
//!
//! One variant per failure kind; per-connection failures are collected into
//! the run's error map rather than raised.

use thiserror::Error;

/// Main error type for Prismatic operations.
#[derive(Error, Debug, Clone)]
pub enum PrismaticError {
    /// Configuration errors (invalid TOML, missing file, bad logger output, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection construction errors (bad DSN, driver open failed).
    #[error("Connection error: {0}")]
    Connect(String),

    /// Liveness check failures after all retry attempts.
    #[error("Ping error: {0}")]
    Ping(String),

    /// An operation observed a cancelled run.
    #[error("Operation cancelled")]
    Cancelled,

    /// Transaction lifecycle errors (begin, prepare, commit, rollback).
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Query execution and row materialization errors.
    #[error("Query error: {0}")]
    Query(String),

    /// Export errors (workbook creation, row write, save).
    #[error("Export error: {0}")]
    Export(String),

    /// User-facing misuse (unknown output format, no data returned, etc.)
    #[error("{0}")]
    Usage(String),
}

impl PrismaticError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }

    /// Creates a ping error with the given message.
    pub fn ping(msg: impl Into<String>) -> Self {
        Self::Ping(msg.into())
    }

    /// Creates a transaction error with the given message.
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an export error with the given message.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Creates a usage error with the given message.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Connect(_) => "Connection Error",
            Self::Ping(_) => "Ping Error",
            Self::Cancelled => "Cancelled",
            Self::Transaction(_) => "Transaction Error",
            Self::Query(_) => "Query Error",
            Self::Export(_) => "Export Error",
            Self::Usage(_) => "Usage Error",
        }
    }
}

/// Result type alias using PrismaticError.
pub type Result<T> = std::result::Result<T, PrismaticError>;
