//! Low-level connection facade.
//!
//! [`NetApi::connect`] accepts the `(port, host)` tuple and options
//! calling conventions, extracts the target with `localhost`/`0`
//! defaults, records a `NetConnect` signal, and delegates to
//! `TcpStream::connect`. IPC paths go through
//! [`NetApi::connect_ipc`].

use crate::hooks::HookKind;
use crate::monitor::Monitor;
use crate::signal::{Protocol, SignalMetadata, SignalType};
use std::io;
use std::net::TcpStream;

/// Options-style connection target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// Normalized TCP connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
}

impl From<(u16, &str)> for ConnectTarget {
    fn from((port, host): (u16, &str)) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

impl From<(u16, String)> for ConnectTarget {
    fn from((port, host): (u16, String)) -> Self {
        Self { host, port }
    }
}

impl From<u16> for ConnectTarget {
    fn from(port: u16) -> Self {
        Self {
            host: "localhost".to_string(),
            port,
        }
    }
}

impl From<ConnectOptions> for ConnectTarget {
    fn from(options: ConnectOptions) -> Self {
        Self {
            host: options.host.unwrap_or_else(|| "localhost".to_string()),
            port: options.port.unwrap_or(0),
        }
    }
}

/// Facade over the TCP connect entry point.
pub struct NetApi {
    monitor: Monitor,
}

impl NetApi {
    pub(crate) fn new(monitor: Monitor) -> Self {
        Self { monitor }
    }

    fn observe(&self, host: &str, port: u16) {
        self.monitor.record(
            HookKind::Net,
            SignalType::NetConnect,
            SignalMetadata::NetConnect {
                host: host.to_string(),
                port,
                protocol: Protocol::Tcp,
            },
        );
    }

    /// Open a TCP connection, as `TcpStream::connect`.
    pub fn connect(&self, target: impl Into<ConnectTarget>) -> io::Result<TcpStream> {
        let target = target.into();
        self.observe(&target.host, target.port);
        TcpStream::connect((target.host.as_str(), target.port))
    }

    /// Open an IPC (Unix domain socket) connection.
    #[cfg(unix)]
    pub fn connect_ipc(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> io::Result<std::os::unix::net::UnixStream> {
        let path = path.as_ref();
        self.observe(&path.to_string_lossy(), 0);
        std::os::unix::net::UnixStream::connect(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::TcpListener;

    #[test]
    fn test_target_conventions() {
        let from_tuple = ConnectTarget::from((8080, "example.com"));
        assert_eq!(from_tuple.host, "example.com");
        assert_eq!(from_tuple.port, 8080);

        let from_port = ConnectTarget::from(9000);
        assert_eq!(from_port.host, "localhost");

        let from_options = ConnectTarget::from(ConnectOptions::new().host("10.0.0.1"));
        assert_eq!(from_options.host, "10.0.0.1");
        assert_eq!(from_options.port, 0);
    }

    #[test]
    fn test_connect_delegates() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let api = NetApi::new(Monitor::new());
        let stream = api.connect((port, "127.0.0.1")).unwrap();
        assert_eq!(stream.peer_addr().unwrap().port(), port);
    }

    #[test]
    fn test_connect_failure_matches_std() {
        // Port 0 connects fail identically through the facade.
        let api = NetApi::new(Monitor::new());
        let facade_err = api.connect((0, "127.0.0.1")).unwrap_err();
        let std_err = TcpStream::connect(("127.0.0.1", 0)).unwrap_err();
        assert_eq!(facade_err.kind(), std_err.kind());
    }
}
