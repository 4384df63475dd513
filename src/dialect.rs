//! Dialect routing: driver name to connection-string grammar.

use tracing::debug;

use crate::error::ParseError;
use crate::semconv::{self, AttributeSet, KeyValue};
use crate::{mysql, postgres};

/// Connection-string dialect, selected by driver name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// PostgreSQL (URL or keyword/value form).
    Postgres,
    /// MySQL / MariaDB flat DSN form.
    MySql,
    /// Unrecognized driver; parses to a generic marker with no settings.
    Other,
}

impl Dialect {
    /// Resolve a driver name to its dialect.
    ///
    /// Recognized names: `mysql`, `postgres` and the `postgresql` alias,
    /// case-insensitively. Anything else maps to [`Dialect::Other`],
    /// which is not an error.
    pub fn from_driver_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "postgres" | "postgresql" => Self::Postgres,
            "mysql" => Self::MySql,
            _ => Self::Other,
        }
    }

    /// Get the dialect name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Other => "other",
        }
    }

    /// Parse a DSN in this dialect into its database name and derived
    /// attribute set.
    pub fn parse(self, dsn: &str) -> Result<ConnectionInfo, ParseError> {
        match self {
            Self::Postgres => postgres::parse(dsn),
            Self::MySql => mysql::parse(dsn),
            Self::Other => Ok(ConnectionInfo {
                database: String::new(),
                attributes: vec![KeyValue::string(
                    semconv::DB_SYSTEM,
                    semconv::DB_SYSTEM_OTHER_SQL,
                )],
            }),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The result of parsing one DSN: the database name for span naming and
/// the attribute set to attach at connection open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Database name, or empty when the DSN names none.
    pub database: String,
    /// Derived semantic attributes, credentials redacted.
    pub attributes: AttributeSet,
}

/// Parse a DSN for the given driver name.
///
/// This is the dialect-routing entry point: the driver name picks the
/// grammar, the DSN is parsed and normalized, and the result carries the
/// database name plus the derived attribute set. Unknown driver names are
/// not an error; they yield a generic "other SQL" marker.
///
/// # Example
///
/// ```rust
/// let info = dsn_tracing::parse("mysql", "tcp(127.0.0.1:3306)/shop").unwrap();
/// assert_eq!(info.database, "shop");
/// ```
pub fn parse(driver_name: &str, dsn: &str) -> Result<ConnectionInfo, ParseError> {
    let dialect = Dialect::from_driver_name(driver_name);
    debug!(driver = driver_name, dialect = %dialect, dsn_len = dsn.len(), "parsing dsn");
    dialect.parse(dsn)
}
