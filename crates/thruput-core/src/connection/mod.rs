//! Server endpoints and socket setup.
//!
//! An [`Endpoint`] is a host name or IP address plus a port. [`connect`]
//! dials it and prepares the socket for bulk transfers.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::DEFAULT_PORT;

/// Address of a transfer server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint from a host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a host string into an endpoint.
    ///
    /// Accepts formats:
    /// - `HOST` (e.g., `192.168.1.100` or `bench.local`) - uses `default_port`
    /// - `HOST:PORT` (e.g., `192.168.1.100:9000`)
    /// - `[IPv6]` (e.g., `[::1]`) - uses `default_port`
    /// - `[IPv6]:PORT` (e.g., `[::1]:9000`)
    /// - a bare IPv6 address (e.g., `::1`) - uses `default_port`
    ///
    /// # Examples
    ///
    /// ```
    /// use thruput_core::connection::Endpoint;
    ///
    /// let endpoint = Endpoint::parse("192.168.1.100", 65432).unwrap();
    /// assert_eq!(endpoint.port, 65432);
    ///
    /// let endpoint = Endpoint::parse("bench.local:9000", 65432).unwrap();
    /// assert_eq!(endpoint.host, "bench.local");
    /// assert_eq!(endpoint.port, 9000);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the host string cannot be parsed.
    pub fn parse(host: &str, default_port: u16) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(Error::InvalidInput("host must not be empty".to_string()));
        }

        if let Some(rest) = host.strip_prefix('[') {
            let (ip_str, after) = rest.split_once(']').ok_or_else(|| invalid_host(host))?;
            let ip: IpAddr = ip_str.parse().map_err(|_| invalid_host(host))?;
            let port = match after {
                "" => default_port,
                _ => parse_port(after.strip_prefix(':').ok_or_else(|| invalid_host(host))?)?,
            };
            return Ok(Self::new(ip.to_string(), port));
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(Self::new(ip.to_string(), default_port));
        }

        match host.rsplit_once(':') {
            Some((name, port)) if !name.contains(':') => {
                if name.is_empty() {
                    return Err(invalid_host(host));
                }
                Ok(Self::new(name, parse_port(port)?))
            }
            Some(_) => Err(invalid_host(host)),
            None => Ok(Self::new(host, default_port)),
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(crate::DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn invalid_host(host: &str) -> Error {
    Error::InvalidInput(format!(
        "Invalid host format '{host}'. Use HOST or HOST:PORT (e.g., 192.168.1.100 or 192.168.1.100:65432)"
    ))
}

fn parse_port(port: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(Error::InvalidInput(format!(
            "Invalid port '{port}'. Port must be a number between 1 and 65535"
        ))),
    }
}

/// Socket options applied when connecting.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound for establishing the connection (`None` waits indefinitely)
    pub connect_timeout: Option<Duration>,
    /// Enable TCP keep-alive probes
    pub keepalive: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            keepalive: true,
        }
    }
}

/// Open a TCP connection to `endpoint`.
///
/// # Errors
///
/// Returns `Error::Connect` if the address cannot be resolved or reached
/// within the configured timeout.
pub async fn connect(endpoint: &Endpoint, options: &ConnectOptions) -> Result<TcpStream> {
    let addr = endpoint.to_string();
    let dial = TcpStream::connect((endpoint.host.as_str(), endpoint.port));

    let stream = match options.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, dial).await.map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("no answer within {} seconds", limit.as_secs()),
            )
        }),
        None => Ok(dial.await),
    }
    .and_then(|result| result)
    .map_err(|source| Error::Connect {
        addr: addr.clone(),
        source,
    })?;

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Failed to set TCP_NODELAY: {}", e);
    }
    if options.keepalive {
        configure_tcp_keepalive(&stream)?;
    }

    tracing::info!("Connected to {}", addr);
    Ok(stream)
}

/// Configure TCP keep-alive on a socket.
///
/// - Start probing after 10 seconds of idle time
/// - Send probes every 5 seconds
fn configure_tcp_keepalive(stream: &TcpStream) -> Result<()> {
    let socket_ref = SockRef::from(stream);

    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(10))
        .with_interval(Duration::from_secs(5));

    socket_ref.set_tcp_keepalive(&keepalive)?;

    tracing::debug!("TCP keep-alive enabled on socket");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4_only() {
        let endpoint = Endpoint::parse("192.168.1.100", DEFAULT_PORT).unwrap();
        assert_eq!(endpoint.host, "192.168.1.100");
        assert_eq!(endpoint.port, DEFAULT_PORT);
    }

    #[test]
    fn test_parse_ipv4_with_port() {
        let endpoint = Endpoint::parse("192.168.1.100:52540", DEFAULT_PORT).unwrap();
        assert_eq!(endpoint.host, "192.168.1.100");
        assert_eq!(endpoint.port, 52540);
    }

    #[test]
    fn test_parse_ipv6_forms() {
        let endpoint = Endpoint::parse("[::1]", DEFAULT_PORT).unwrap();
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.port, DEFAULT_PORT);

        let endpoint = Endpoint::parse("[2001:db8::1]:9000", DEFAULT_PORT).unwrap();
        assert_eq!(endpoint.host, "2001:db8::1");
        assert_eq!(endpoint.port, 9000);

        let endpoint = Endpoint::parse("::1", 7000).unwrap();
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.port, 7000);
    }

    #[test]
    fn test_parse_hostname() {
        let endpoint = Endpoint::parse("localhost", 1234).unwrap();
        assert_eq!(endpoint, Endpoint::new("localhost", 1234));

        let endpoint = Endpoint::parse("  bench.local:8080  ", 1234).unwrap();
        assert_eq!(endpoint, Endpoint::new("bench.local", 8080));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Endpoint::parse("", DEFAULT_PORT).is_err());
        assert!(Endpoint::parse("192.168.1.100:abc", DEFAULT_PORT).is_err());
        assert!(Endpoint::parse("host:0", DEFAULT_PORT).is_err());
        assert!(Endpoint::parse("[::1", DEFAULT_PORT).is_err());
        assert!(Endpoint::parse("[::1]9000", DEFAULT_PORT).is_err());
        assert!(Endpoint::parse(":9000", DEFAULT_PORT).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Endpoint::new("10.0.0.1", 65432).to_string(), "10.0.0.1:65432");
        assert_eq!(Endpoint::new("::1", 65432).to_string(), "[::1]:65432");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect(&Endpoint::new("127.0.0.1", port), &ConnectOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
    }
}
