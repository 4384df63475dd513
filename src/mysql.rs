//! MySQL dialect: the flat `[user[:pass]@][net[(addr)]]/dbname[?params]`
//! DSN grammar and its attribute derivation.

use std::collections::BTreeMap;
use std::net::IpAddr;

use tracing::debug;

use crate::dialect::ConnectionInfo;
use crate::error::ParseError;
use crate::semconv::{self, KeyValue};
use crate::settings;

/// Structured form of a MySQL DSN.
///
/// Mirrors the established flat-DSN schema: credentials, network protocol
/// (`tcp`, `unix`, `pipe`, `memory`, ...), address, database name and raw
/// parameters. [`Descriptor::redacted`] clears the password so the
/// re-serialized string is safe to attach to telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub user: String,
    pub password: String,
    pub net: String,
    pub addr: String,
    pub database: String,
    pub params: BTreeMap<String, String>,
    /// Set once the password has been cleared for re-serialization.
    pub redacted: bool,
}

impl Descriptor {
    /// Parse a MySQL DSN.
    ///
    /// The scan looks for the last `/` since both the password and the
    /// address may contain one. An empty DSN parses to the all-defaults
    /// descriptor; a non-empty DSN without a `/` is an error.
    pub fn parse(dsn: &str) -> Result<Self, ParseError> {
        let mut descriptor = Descriptor::default();
        let bytes = dsn.as_bytes();
        let mut found_slash = false;

        for i in (0..bytes.len()).rev() {
            if bytes[i] != b'/' {
                continue;
            }
            found_slash = true;

            if i > 0 {
                descriptor.parse_left(&dsn[..i])?;
            }

            match dsn[i + 1..].split_once('?') {
                Some((database, query)) => {
                    descriptor.database = database.to_string();
                    descriptor.parse_params(query)?;
                }
                None => descriptor.database = dsn[i + 1..].to_string(),
            }
            break;
        }

        if !found_slash && !dsn.is_empty() {
            return Err(ParseError::MissingDatabaseSeparator);
        }

        descriptor.normalize();

        debug!(
            net = %descriptor.net,
            database = %descriptor.database,
            "parsed mysql descriptor"
        );

        Ok(descriptor)
    }

    // `[user[:password]@][net[(addr)]]`, everything before the last slash.
    fn parse_left(&mut self, left: &str) -> Result<(), ParseError> {
        let net_part = match left.rsplit_once('@') {
            Some((credentials, net_part)) => {
                match credentials.split_once(':') {
                    Some((user, password)) => {
                        self.user = user.to_string();
                        self.password = password.to_string();
                    }
                    None => self.user = credentials.to_string(),
                }
                net_part
            }
            None => left,
        };

        match net_part.find('(') {
            Some(open) => {
                if !net_part.ends_with(')') {
                    return Err(if net_part[open + 1..].contains(')') {
                        ParseError::UnescapedParamValue
                    } else {
                        ParseError::UnterminatedAddress
                    });
                }
                self.addr = net_part[open + 1..net_part.len() - 1].to_string();
                self.net = net_part[..open].to_string();
            }
            None => self.net = net_part.to_string(),
        }

        Ok(())
    }

    fn parse_params(&mut self, query: &str) -> Result<(), ParseError> {
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            self.params
                .insert(key.to_string(), settings::percent_decode(value)?);
        }
        Ok(())
    }

    // Fill in the grammar's defaults: tcp transport, well-known addresses,
    // and a port for tcp addresses that lack one.
    fn normalize(&mut self) {
        if self.net.is_empty() {
            self.net = "tcp".to_string();
        }
        if self.addr.is_empty() {
            self.addr = match self.net.as_str() {
                "tcp" => "127.0.0.1:3306".to_string(),
                "unix" => "/tmp/mysql.sock".to_string(),
                _ => String::new(),
            };
        } else if self.net == "tcp" && !self.addr.contains(':') {
            self.addr.push_str(":3306");
        }
    }

    /// Copy of this descriptor with the password cleared.
    pub fn redacted(&self) -> Self {
        Self {
            password: String::new(),
            redacted: true,
            ..self.clone()
        }
    }

    /// Re-serialize into DSN form. Parameters are emitted in sorted key
    /// order, so output is deterministic.
    pub fn to_dsn(&self) -> String {
        let mut dsn = String::new();

        if !self.user.is_empty() {
            dsn.push_str(&self.user);
            if !self.password.is_empty() {
                dsn.push(':');
                dsn.push_str(&self.password);
            }
            dsn.push('@');
        }

        if !self.net.is_empty() {
            dsn.push_str(&self.net);
            if !self.addr.is_empty() {
                dsn.push('(');
                dsn.push_str(&self.addr);
                dsn.push(')');
            }
        }

        dsn.push('/');
        dsn.push_str(&self.database);

        for (i, (key, value)) in self.params.iter().enumerate() {
            dsn.push(if i == 0 { '?' } else { '&' });
            dsn.push_str(key);
            dsn.push('=');
            dsn.push_str(value);
        }

        dsn
    }
}

pub(crate) fn parse(dsn: &str) -> Result<ConnectionInfo, ParseError> {
    let descriptor = Descriptor::parse(dsn)?;
    let database = descriptor.database.clone();

    let mut attributes = vec![
        KeyValue::string(semconv::DB_SYSTEM, semconv::DB_SYSTEM_MYSQL),
        KeyValue::string(semconv::DB_NAME, database.clone()),
        KeyValue::string(semconv::DB_CONNECTION_STRING, descriptor.redacted().to_dsn()),
    ];

    if !descriptor.user.is_empty() {
        attributes.push(KeyValue::string(semconv::DB_USER, descriptor.user.clone()));
    }

    match descriptor.net.as_str() {
        "pipe" => attributes.push(KeyValue::string(semconv::NET_TRANSPORT, semconv::TRANSPORT_PIPE)),
        "unix" | "socket" => {
            attributes.push(KeyValue::string(semconv::NET_TRANSPORT, semconv::TRANSPORT_UNIX))
        }
        "memory" => {
            attributes.push(KeyValue::string(semconv::NET_TRANSPORT, semconv::TRANSPORT_INPROC))
        }
        "tcp" => {
            attributes.push(KeyValue::string(semconv::NET_TRANSPORT, semconv::TRANSPORT_TCP));
            push_peer_attributes(&descriptor.addr, &mut attributes);
        }
        _ => {}
    }

    Ok(ConnectionInfo {
        database,
        attributes,
    })
}

// Best-effort host/port classification of a tcp address; failures emit
// nothing.
fn push_peer_attributes(addr: &str, attributes: &mut Vec<KeyValue>) {
    let (host, port) = match addr.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (addr, None),
    };

    let host = host.trim_matches(|c| c == '[' || c == ']');
    if !host.is_empty() {
        match host.parse::<IpAddr>() {
            Ok(ip) => attributes.push(KeyValue::string(semconv::NET_PEER_IP, ip.to_string())),
            Err(_) => attributes.push(KeyValue::string(semconv::NET_PEER_NAME, host)),
        }
    }

    if let Some(port) = port {
        if let Ok(port) = port.parse::<i64>() {
            attributes.push(KeyValue::int(semconv::NET_PEER_PORT, port));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semconv::Value;

    fn attr<'a>(attrs: &'a [KeyValue], key: &str) -> Option<&'a Value> {
        attrs.iter().find(|a| a.key == key).map(|a| &a.value)
    }

    #[test]
    fn test_parse_full() {
        let descriptor = Descriptor::parse("user:pass@tcp(127.0.0.1:3306)/db").unwrap();
        assert_eq!(descriptor.user, "user");
        assert_eq!(descriptor.password, "pass");
        assert_eq!(descriptor.net, "tcp");
        assert_eq!(descriptor.addr, "127.0.0.1:3306");
        assert_eq!(descriptor.database, "db");
    }

    #[test]
    fn test_parse_password_with_colon_and_slash() {
        let descriptor = Descriptor::parse("user:pa:s/s@tcp(localhost:3306)/db").unwrap();
        assert_eq!(descriptor.user, "user");
        assert_eq!(descriptor.password, "pa:s/s");
        assert_eq!(descriptor.database, "db");
    }

    #[test]
    fn test_parse_minimal() {
        let descriptor = Descriptor::parse("/db").unwrap();
        assert_eq!(descriptor.user, "");
        assert_eq!(descriptor.net, "tcp");
        assert_eq!(descriptor.addr, "127.0.0.1:3306");
        assert_eq!(descriptor.database, "db");
    }

    #[test]
    fn test_parse_empty_dsn_defaults() {
        let descriptor = Descriptor::parse("").unwrap();
        assert_eq!(descriptor.net, "tcp");
        assert_eq!(descriptor.addr, "127.0.0.1:3306");
        assert_eq!(descriptor.database, "");
    }

    #[test]
    fn test_parse_unix_default_addr() {
        let descriptor = Descriptor::parse("user@unix/db").unwrap();
        assert_eq!(descriptor.net, "unix");
        assert_eq!(descriptor.addr, "/tmp/mysql.sock");
    }

    #[test]
    fn test_parse_tcp_port_completion() {
        let descriptor = Descriptor::parse("tcp(db.example.com)/db").unwrap();
        assert_eq!(descriptor.addr, "db.example.com:3306");
    }

    #[test]
    fn test_parse_params() {
        let descriptor =
            Descriptor::parse("user@tcp(localhost)/db?charset=utf8mb4&timeout=10s").unwrap();
        assert_eq!(descriptor.params["charset"], "utf8mb4");
        assert_eq!(descriptor.params["timeout"], "10s");
    }

    #[test]
    fn test_parse_param_percent_decoding() {
        let descriptor = Descriptor::parse("/db?loc=Asia%2FShanghai").unwrap();
        assert_eq!(descriptor.params["loc"], "Asia/Shanghai");
    }

    #[test]
    fn test_parse_missing_slash() {
        assert_eq!(
            Descriptor::parse("user:pass@tcp(localhost:3306)"),
            Err(ParseError::MissingDatabaseSeparator)
        );
    }

    #[test]
    fn test_parse_unterminated_address() {
        assert_eq!(
            Descriptor::parse("user@tcp(localhost:3306/db"),
            Err(ParseError::UnterminatedAddress)
        );
    }

    #[test]
    fn test_parse_unescaped_value() {
        assert_eq!(
            Descriptor::parse("user@tcp(localhost:3306)x/db"),
            Err(ParseError::UnescapedParamValue)
        );
    }

    #[test]
    fn test_to_dsn_round_trip() {
        let descriptor = Descriptor::parse("user:pass@tcp(localhost:3306)/db?charset=utf8").unwrap();
        assert_eq!(
            descriptor.to_dsn(),
            "user:pass@tcp(localhost:3306)/db?charset=utf8"
        );
    }

    #[test]
    fn test_redacted_drops_password() {
        let descriptor = Descriptor::parse("user:pass@tcp(localhost:3306)/db").unwrap();
        let redacted = descriptor.redacted();
        assert!(redacted.redacted);
        assert_eq!(redacted.password, "");
        assert_eq!(redacted.to_dsn(), "user@tcp(localhost:3306)/db");
    }

    #[test]
    fn test_attributes_tcp() {
        let info = parse("user:pass@tcp(127.0.0.1:3306)/db").unwrap();
        assert_eq!(info.database, "db");
        assert_eq!(
            attr(&info.attributes, semconv::DB_SYSTEM),
            Some(&Value::String("mysql".into()))
        );
        assert_eq!(
            attr(&info.attributes, semconv::NET_TRANSPORT),
            Some(&Value::String("ip_tcp".into()))
        );
        assert_eq!(
            attr(&info.attributes, semconv::NET_PEER_IP),
            Some(&Value::String("127.0.0.1".into()))
        );
        assert_eq!(
            attr(&info.attributes, semconv::NET_PEER_PORT),
            Some(&Value::Int(3306))
        );
        assert_eq!(
            attr(&info.attributes, semconv::DB_USER),
            Some(&Value::String("user".into()))
        );
    }

    #[test]
    fn test_attributes_never_leak_password() {
        let info = parse("user:pass@tcp(127.0.0.1:3306)/db").unwrap();
        for a in &info.attributes {
            assert!(!a.value.to_string().contains("pass"));
        }
        assert_eq!(
            attr(&info.attributes, semconv::DB_CONNECTION_STRING),
            Some(&Value::String("user@tcp(127.0.0.1:3306)/db".into()))
        );
    }

    #[test]
    fn test_attributes_hostname_peer() {
        let info = parse("user@tcp(db.example.com:3306)/db").unwrap();
        assert_eq!(
            attr(&info.attributes, semconv::NET_PEER_NAME),
            Some(&Value::String("db.example.com".into()))
        );
        assert!(attr(&info.attributes, semconv::NET_PEER_IP).is_none());
    }

    #[test]
    fn test_attributes_transport_mapping() {
        let info = parse("user@unix(/var/lib/mysql/mysql.sock)/db").unwrap();
        assert_eq!(
            attr(&info.attributes, semconv::NET_TRANSPORT),
            Some(&Value::String("unix".into()))
        );
        assert!(attr(&info.attributes, semconv::NET_PEER_NAME).is_none());

        let info = parse("user@memory()/db").unwrap();
        assert_eq!(
            attr(&info.attributes, semconv::NET_TRANSPORT),
            Some(&Value::String("inproc".into()))
        );

        let info = parse("user@custom(addr)/db").unwrap();
        assert!(attr(&info.attributes, semconv::NET_TRANSPORT).is_none());
    }

    #[test]
    fn test_attributes_no_user() {
        let info = parse("/db").unwrap();
        assert!(attr(&info.attributes, semconv::DB_USER).is_none());
    }
}
