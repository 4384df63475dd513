//! OpenTelemetry semantic-convention vocabulary for database connections,
//! and the attribute pairs derived from a parsed DSN.

use tracing::{field, Span};

/// Database system identifier (`postgresql`, `mysql`, ...).
pub const DB_SYSTEM: &str = "db.system";
/// Name of the database being connected to.
pub const DB_NAME: &str = "db.name";
/// Database user name.
pub const DB_USER: &str = "db.user";
/// Connection string with credential material removed.
pub const DB_CONNECTION_STRING: &str = "db.connection_string";
/// Transport protocol used to reach the database.
pub const NET_TRANSPORT: &str = "net.transport";
/// Remote hostname or socket path.
pub const NET_PEER_NAME: &str = "net.peer.name";
/// Remote address as a literal IP.
pub const NET_PEER_IP: &str = "net.peer.ip";
/// Remote port number.
pub const NET_PEER_PORT: &str = "net.peer.port";

// Well-known db.system values
pub const DB_SYSTEM_POSTGRESQL: &str = "postgresql";
pub const DB_SYSTEM_MYSQL: &str = "mysql";
pub const DB_SYSTEM_OTHER_SQL: &str = "other_sql";

// Well-known net.transport values
pub const TRANSPORT_TCP: &str = "ip_tcp";
pub const TRANSPORT_UNIX: &str = "unix";
pub const TRANSPORT_PIPE: &str = "pipe";
pub const TRANSPORT_INPROC: &str = "inproc";

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Int(i64),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
        }
    }
}

/// A single semantic key/value attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: &'static str,
    pub value: Value,
}

impl KeyValue {
    pub fn string(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: Value::String(value.into()),
        }
    }

    pub fn int(key: &'static str, value: i64) -> Self {
        Self {
            key,
            value: Value::Int(value),
        }
    }
}

/// Ordered set of attributes derived from one parse call.
///
/// Each distinct semantic key is attached at most once per call.
pub type AttributeSet = Vec<KeyValue>;

/// Create a tracing span describing a database connection and record the
/// derived attribute set into it.
///
/// The span declares every attribute field up front so recorders keyed on
/// field names (e.g. `tracing-opentelemetry`) pick them up; attributes
/// absent from `attributes` stay empty.
///
/// # Example
///
/// ```rust
/// let info = dsn_tracing::parse("postgres", "postgres://alice@localhost/app").unwrap();
/// let span = dsn_tracing::connection_span(&info.database, &info.attributes);
/// let _guard = span.enter();
/// ```
pub fn connection_span(database: &str, attributes: &[KeyValue]) -> Span {
    let span_name = if database.is_empty() {
        "connect".to_string()
    } else {
        format!("connect {database}")
    };

    let span = tracing::info_span!(
        "db.connect",
        otel.name = %span_name,
        otel.kind = "client",
        db.system = field::Empty,
        db.name = field::Empty,
        db.user = field::Empty,
        db.connection_string = field::Empty,
        net.transport = field::Empty,
        net.peer.name = field::Empty,
        net.peer.ip = field::Empty,
        net.peer.port = field::Empty,
    );

    for attr in attributes {
        match &attr.value {
            Value::String(v) => span.record(attr.key, v.as_str()),
            Value::Int(v) => span.record(attr.key, *v),
        };
    }

    span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::String("mydb".into()).to_string(), "mydb");
        assert_eq!(Value::Int(5432).to_string(), "5432");
    }

    #[test]
    fn test_connection_span_smoke() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let attrs = vec![
                KeyValue::string(DB_SYSTEM, DB_SYSTEM_POSTGRESQL),
                KeyValue::int(NET_PEER_PORT, 5432),
            ];
            let span = connection_span("mydb", &attrs);
            assert_eq!(span.metadata().unwrap().name(), "db.connect");
        });
    }
}
