use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Outcome of one connection attempt.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
    Error,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortState::Open => write!(f, "open"),
            PortState::Closed => write!(f, "closed"),
            PortState::Error => write!(f, "error"),
        }
    }
}

/// One probed port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortResult {
    pub port: u16,
    pub state: PortState,
    pub service: Option<String>,
    pub latency: Option<Duration>,
    /// Message of the I/O fault when `state` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PortResult {
    pub fn open(port: u16, service: Option<&str>, latency: Duration) -> Self {
        Self {
            port,
            state: PortState::Open,
            service: service.map(str::to_owned),
            latency: Some(latency),
            error: None,
        }
    }

    pub fn closed(port: u16, service: Option<&str>, latency: Option<Duration>) -> Self {
        Self {
            port,
            state: PortState::Closed,
            service: service.map(str::to_owned),
            latency,
            error: None,
        }
    }

    pub fn error(port: u16, service: Option<&str>, msg: impl Into<String>) -> Self {
        Self {
            port,
            state: PortState::Error,
            service: service.map(str::to_owned),
            latency: None,
            error: Some(msg.into()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}

/// Coarse operating system family derived from open ports.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OsGuess {
    Linux,
    Windows,
    Unknown,
}

impl fmt::Display for OsGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsGuess::Linux => write!(f, "linux"),
            OsGuess::Windows => write!(f, "windows"),
            OsGuess::Unknown => write!(f, "unknown"),
        }
    }
}

/// Everything one scan produced, ordered by port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub target: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    pub results: Vec<PortResult>,
    pub os_guess: OsGuess,
    /// False when the scan was cancelled before every port was probed.
    pub complete: bool,
}

impl ScanReport {
    pub fn open_ports(&self) -> impl Iterator<Item = &PortResult> + '_ {
        self.results.iter().filter(|r| r.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.open_ports().count()
    }

    pub fn elapsed(&self) -> Duration {
        (self.ended_at - self.started_at)
            .try_into()
            .unwrap_or(Duration::ZERO)
    }
}
