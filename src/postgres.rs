//! Postgres dialect: DSN routing, platform defaults and attribute
//! derivation.

use std::net::IpAddr;
use std::path::Path;

use tracing::debug;

use crate::dialect::ConnectionInfo;
use crate::error::ParseError;
use crate::semconv::{self, KeyValue};
use crate::settings::{self, Settings};

// Probed in order when no host is given; first existing directory wins.
const SOCKET_DIRS: &[&str] = &["/var/run/postgresql", "/private/tmp", "/tmp"];

const DEFAULT_PORT: &str = "5432";

/// Filesystem capability used to resolve the default socket directory.
///
/// The default host lookup checks a handful of well-known local socket
/// directories. Substituting this trait lets tests (or latency-sensitive
/// callers) avoid touching the real filesystem.
pub trait SocketProbe {
    /// Report whether a candidate socket directory exists.
    fn exists(&self, path: &Path) -> bool;
}

/// [`SocketProbe`] backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl SocketProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Parse a Postgres DSN in either grammar into normalized settings.
///
/// URL-form DSNs (`postgres://` / `postgresql://`) and keyword/value DSNs
/// both produce the same map. Defaults for `host`, `port` and `user` are
/// merged in for keys the DSN did not set. An empty DSN yields an empty
/// map with no defaults applied.
pub fn parse_settings(dsn: &str) -> Result<Settings, ParseError> {
    parse_settings_with(dsn, &FsProbe)
}

/// [`parse_settings`] with an explicit socket-directory probe.
pub fn parse_settings_with(dsn: &str, probe: &dyn SocketProbe) -> Result<Settings, ParseError> {
    if dsn.is_empty() {
        return Ok(Settings::new());
    }

    let mut settings = if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
        settings::parse_url(dsn)?
    } else {
        settings::parse_keyword_value(dsn)?
    };

    apply_defaults(&mut settings, probe);

    debug!(
        host = settings.get("host").map(String::as_str),
        database = settings.get("database").map(String::as_str),
        "parsed postgres settings"
    );

    Ok(settings)
}

// Defaults never overwrite a parsed value, and a missing OS user is not an
// error: the caller may supply one explicitly.
fn apply_defaults(settings: &mut Settings, probe: &dyn SocketProbe) {
    settings
        .entry("host".to_string())
        .or_insert_with(|| default_host(probe));
    settings
        .entry("port".to_string())
        .or_insert_with(|| DEFAULT_PORT.to_string());
    if !settings.contains_key("user") {
        if let Some(user) = os_user_name() {
            settings.insert("user".to_string(), user);
        }
    }
}

fn default_host(probe: &dyn SocketProbe) -> String {
    SOCKET_DIRS
        .iter()
        .find(|dir| probe.exists(Path::new(dir)))
        .map(|dir| (*dir).to_string())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(unix)]
fn os_user_name() -> Option<String> {
    users::get_current_username().and_then(|name| name.into_string().ok())
}

#[cfg(not(unix))]
fn os_user_name() -> Option<String> {
    std::env::var("USERNAME").ok()
}

pub(crate) fn parse(dsn: &str) -> Result<ConnectionInfo, ParseError> {
    let settings = parse_settings(dsn)?;
    let database = settings.get("database").cloned().unwrap_or_default();

    let mut attributes = vec![
        KeyValue::string(semconv::DB_SYSTEM, semconv::DB_SYSTEM_POSTGRESQL),
        KeyValue::string(semconv::DB_NAME, database.clone()),
    ];

    // The raw DSN is attached only when no password key was parsed at all,
    // rather than scanning the string for credential material.
    if !settings.contains_key("password") {
        attributes.push(KeyValue::string(semconv::DB_CONNECTION_STRING, dsn));
    }

    if let Some(user) = settings.get("user") {
        attributes.push(KeyValue::string(semconv::DB_USER, user.clone()));
    }

    push_peer_attributes(&settings, &mut attributes);

    Ok(ConnectionInfo {
        database,
        attributes,
    })
}

// hostaddr carries an already-resolved IP and takes precedence over host.
// Classification is best-effort: a miss emits nothing.
fn push_peer_attributes(settings: &Settings, attributes: &mut Vec<KeyValue>) {
    let hostaddr = settings.get("hostaddr").filter(|v| !v.is_empty());
    let host = settings.get("host").filter(|v| !v.is_empty());

    if hostaddr.is_some() {
        let ip = [hostaddr, host]
            .into_iter()
            .flatten()
            .find_map(|value| first_entry(value).parse::<IpAddr>().ok());
        if let Some(ip) = ip {
            attributes.push(KeyValue::string(semconv::NET_TRANSPORT, semconv::TRANSPORT_TCP));
            attributes.push(KeyValue::string(semconv::NET_PEER_IP, ip.to_string()));
        }
    } else if let Some(host) = host {
        let first = first_entry(host);
        if first.starts_with('/') {
            attributes.push(KeyValue::string(semconv::NET_TRANSPORT, semconv::TRANSPORT_UNIX));
            attributes.push(KeyValue::string(semconv::NET_PEER_NAME, first));
        } else if let Ok(ip) = first.parse::<IpAddr>() {
            attributes.push(KeyValue::string(semconv::NET_TRANSPORT, semconv::TRANSPORT_TCP));
            attributes.push(KeyValue::string(semconv::NET_PEER_IP, ip.to_string()));
        } else {
            attributes.push(KeyValue::string(semconv::NET_TRANSPORT, semconv::TRANSPORT_TCP));
            attributes.push(KeyValue::string(semconv::NET_PEER_NAME, first));
        }
    }

    if let Some(port) = settings.get("port") {
        if let Ok(port) = first_entry(port).parse::<i64>() {
            attributes.push(KeyValue::int(semconv::NET_PEER_PORT, port));
        }
    }
}

// Multi-host DSNs keep comma-joined lists; only the first pair feeds
// attribute derivation.
fn first_entry(value: &str) -> &str {
    value.split(',').next().unwrap_or(value)
}
