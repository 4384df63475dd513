//! Error types surfaced by the DSN grammars.

use thiserror::Error;

/// Errors that can occur while parsing a connection string.
///
/// Every variant is fatal to the parse call that produced it: no partial
/// settings or attributes are returned alongside an error. Best-effort
/// lookups (socket-directory probing, OS user resolution, IP and port
/// classification) never surface here; they simply omit the setting or
/// attribute they would have produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Keyword/value pair without an `=`, or with an empty key.
    #[error("invalid dsn")]
    InvalidDsn,

    /// Unquoted value ended on a backslash with nothing to escape.
    #[error("invalid backslash")]
    InvalidBackslash,

    /// Quoted value with no closing quote.
    #[error("unterminated quoted string in connection info string")]
    UnterminatedQuote,

    /// `%` sequence that is not two hex digits, or decodes to invalid UTF-8.
    #[error("invalid percent-encoding in {0:?}")]
    InvalidPercentEncoding(String),

    /// Host-list entry that is neither a bare host nor a valid `host:port`.
    #[error("failed to split host and port in {0:?}")]
    InvalidHostPort(String),

    /// MySQL DSN without the slash separating the database name.
    #[error("invalid dsn: missing the slash separating the database name")]
    MissingDatabaseSeparator,

    /// MySQL network address opened with `(` but not closed with `)`.
    #[error("invalid dsn: network address not terminated (missing closing brace)")]
    UnterminatedAddress,

    /// MySQL parameter value containing an unescaped `)`.
    #[error("invalid dsn: did you forget to escape a param value?")]
    UnescapedParamValue,
}
