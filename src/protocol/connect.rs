//! TCP endpoint parameters and stream establishment.
//!
//! Attachment and authentication happen on top of the opened stream and are
//! handled by the caller; [`Database::from_stream`](crate::Database::from_stream)
//! takes over once the server has accepted the attachment.

use crate::error::{Error, Result};
use crate::protocol::constants::DEFAULT_PORT;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;

/// Connection parameters.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Host address.
    pub host: String,
    /// Port number.
    pub port: u16,
    /// Database path or alias on the server.
    pub database: String,
    /// TCP connection timeout (default: 20 seconds).
    pub connect_timeout: Duration,
}

impl ConnectParams {
    /// Create new connection parameters.
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            connect_timeout: Duration::from_secs(20),
        }
    }

    /// Set the connection timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use firebird_thin_rs::ConnectParams;
    /// use std::time::Duration;
    ///
    /// let params = ConnectParams::new("localhost", 3050, "employee")
    ///     .with_connect_timeout(Duration::from_secs(5));
    /// assert_eq!(params.connect_timeout, Duration::from_secs(5));
    /// ```
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Parse a connection string like "host:port/database".
    pub fn parse(conn_str: &str) -> Result<Self> {
        // Format: host:port/database or host/database (default port 3050)
        let (addr_part, database) =
            conn_str
                .split_once('/')
                .ok_or_else(|| Error::InvalidConnectString {
                    message: "Expected format: host[:port]/database".to_string(),
                })?;

        if addr_part.is_empty() || database.is_empty() {
            return Err(Error::InvalidConnectString {
                message: format!("Missing host or database in '{}'", conn_str),
            });
        }

        let (host, port) = if let Some((h, p)) = addr_part.split_once(':') {
            let port = p.parse::<u16>().map_err(|_| Error::InvalidConnectString {
                message: format!("Invalid port: {}", p),
            })?;
            (h.to_string(), port)
        } else {
            (addr_part.to_string(), DEFAULT_PORT)
        };

        Ok(Self::new(host, port, database))
    }
}

/// Resolve the host and open a TCP stream, both bounded by the connect timeout.
pub async fn open_stream(params: &ConnectParams) -> Result<TcpStream> {
    let timed_out = || Error::ConnectionTimeout {
        host: params.host.clone(),
        port: params.port,
        timeout: params.connect_timeout,
    };

    let addr_str = format!("{}:{}", params.host, params.port);
    let addrs = timeout(params.connect_timeout, lookup_host(&addr_str))
        .await
        .map_err(|_| timed_out())?
        .map_err(|e| {
            let text = e.to_string();
            if e.kind() == std::io::ErrorKind::NotFound
                || text.contains("could not resolve")
                || text.contains("Name or service not known")
                || text.contains("nodename nor servname provided")
                || text.contains("failed to lookup address")
            {
                Error::DnsResolutionFailed {
                    hostname: params.host.clone(),
                    message: text,
                }
            } else {
                Error::Io(e)
            }
        })?;

    let mut last_error = None;
    for addr in addrs {
        match timeout(params.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                tracing::debug!(%addr, database = %params.database, "tcp stream opened");
                return Ok(stream);
            }
            Ok(Err(e)) => {
                tracing::debug!(%addr, error = %e, "tcp connect failed");
                last_error = Some(Error::Io(e));
            }
            Err(_) => return Err(timed_out()),
        }
    }

    Err(last_error.unwrap_or_else(|| Error::DnsResolutionFailed {
        hostname: params.host.clone(),
        message: "No addresses resolved".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_port() {
        let p = ConnectParams::parse("db.local:3051/data/employee.fdb").unwrap();
        assert_eq!(p.host, "db.local");
        assert_eq!(p.port, 3051);
        assert_eq!(p.database, "data/employee.fdb");
    }

    #[test]
    fn test_parse_default_port() {
        let p = ConnectParams::parse("localhost/employee").unwrap();
        assert_eq!(p.port, 3050);
        assert_eq!(p.connect_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ConnectParams::parse("localhost"),
            Err(Error::InvalidConnectString { .. })
        ));
        assert!(matches!(
            ConnectParams::parse("localhost:port/db"),
            Err(Error::InvalidConnectString { .. })
        ));
        assert!(ConnectParams::parse("/db").is_err());
    }
}
