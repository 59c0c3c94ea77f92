//! Coarse query classification.
//!
//! First-keyword substring matching only; used for operator warnings and
//! cache eligibility, never to gate execution. A keyword inside a string
//! literal or comment is not distinguished.

use crate::error::{PrismaticError, Result};
use std::fmt;

/// The class of a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Reads (SELECT).
    Dql,
    /// Row-changing writes (INSERT, UPDATE, DELETE).
    Dml,
    /// Schema changes (CREATE, DROP).
    Ddl,
}

impl QueryType {
    /// Returns true for classes that do not change database state.
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Dql)
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dql => "DQL",
            Self::Dml => "DML",
            Self::Ddl => "DDL",
        };
        write!(f, "{s}")
    }
}

/// Classifies a SQL string by the first matching keyword.
///
/// Keywords are checked in a fixed order and matched anywhere in the
/// upper-cased statement, so `INSERT ... SELECT` classifies as DQL.
pub fn classify(query: &str) -> Result<QueryType> {
    let upper = query.to_uppercase();

    const KEYWORDS: [(&str, QueryType); 6] = [
        ("SELECT", QueryType::Dql),
        ("INSERT", QueryType::Dml),
        ("UPDATE", QueryType::Dml),
        ("DELETE", QueryType::Dml),
        ("CREATE", QueryType::Ddl),
        ("DROP", QueryType::Ddl),
    ];

    for (keyword, query_type) in KEYWORDS {
        if upper.contains(keyword) {
            return Ok(query_type);
        }
    }

    Err(PrismaticError::query("unable to identify query type"))
}
