//! Bind-status probes.
//!
//! A probe answers one question about a loopback port: is something listening on
//! it ("open") or is it free ("closed")? Errors that are neither answer are
//! surfaced as `io::Error` so callers can retry them instead of guessing.

use std::{fmt, future::Future, io, str::FromStr, time::Duration};

use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    /// Something is accepting connections on the port.
    Open,
    /// Nothing is bound; the port is free to use.
    Closed,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

pub trait PortProbe: Send + Sync {
    fn probe(&self, port: u16) -> impl Future<Output = io::Result<PortStatus>> + Send;
}

/// Probes by connecting. A refused or timed-out connection counts as closed.
#[derive(Debug, Clone)]
pub struct ConnectProbe {
    host: String,
    timeout: Duration,
}

impl ConnectProbe {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            timeout: timeout.max(Duration::from_millis(50)),
        }
    }
}

impl PortProbe for ConnectProbe {
    fn probe(&self, port: u16) -> impl Future<Output = io::Result<PortStatus>> + Send {
        async move {
            let connect = TcpStream::connect((self.host.as_str(), port));
            match tokio::time::timeout(self.timeout, connect).await {
                Ok(Ok(_stream)) => Ok(PortStatus::Open),
                Ok(Err(error)) => classify_connect_error(error),
                Err(_) => Ok(PortStatus::Closed),
            }
        }
    }
}

fn classify_connect_error(error: io::Error) -> io::Result<PortStatus> {
    match error.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::TimedOut => Ok(PortStatus::Closed),
        _ => Err(error),
    }
}

/// Probes by binding and immediately releasing the port.
///
/// Never use this for readiness polling: the brief bind can steal the port from
/// a backend that is about to listen on it.
#[derive(Debug, Clone)]
pub struct BindProbe {
    host: String,
}

impl BindProbe {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl PortProbe for BindProbe {
    fn probe(&self, port: u16) -> impl Future<Output = io::Result<PortStatus>> + Send {
        async move {
            match TcpListener::bind((self.host.as_str(), port)).await {
                Ok(listener) => {
                    drop(listener);
                    Ok(PortStatus::Closed)
                }
                Err(error) if error.kind() == io::ErrorKind::AddrInUse => Ok(PortStatus::Open),
                Err(error) => Err(error),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    Connect,
    Bind,
}

impl FromStr for ProbeStrategy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "connect" => Ok(Self::Connect),
            "bind" => Ok(Self::Bind),
            other => Err(format!(
                "unsupported port probe '{other}', expected 'connect' or 'bind'"
            )),
        }
    }
}

impl fmt::Display for ProbeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::Bind => f.write_str("bind"),
        }
    }
}

/// Probe picked at runtime from [`ProbeStrategy`].
#[derive(Debug, Clone)]
pub enum ConfiguredProbe {
    Connect(ConnectProbe),
    Bind(BindProbe),
}

impl ConfiguredProbe {
    pub fn new(strategy: ProbeStrategy, host: &str, timeout: Duration) -> Self {
        match strategy {
            ProbeStrategy::Connect => Self::Connect(ConnectProbe::new(host, timeout)),
            ProbeStrategy::Bind => Self::Bind(BindProbe::new(host)),
        }
    }
}

impl PortProbe for ConfiguredProbe {
    fn probe(&self, port: u16) -> impl Future<Output = io::Result<PortStatus>> + Send {
        async move {
            match self {
                Self::Connect(probe) => probe.probe(port).await,
                Self::Bind(probe) => probe.probe(port).await,
            }
        }
    }
}
