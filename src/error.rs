// src/error.rs
use std::fmt;
use std::io;
use std::time::Duration;

#[derive(Debug)]
pub enum ProbeError {
    Timeout(Duration),
    Io(io::Error),
    ParseFailed(String),
    Closed,
    Resolve(String),
}

impl ProbeError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseFailed(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// True when a reply arrived but did not look like the expected protocol.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::ParseFailed(_) | Self::Closed)
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(after) => write!(f, "Probe timed out after {}ms", after.as_millis()),
            Self::Io(e) => write!(f, "Socket error: {}", e),
            Self::ParseFailed(msg) => write!(f, "parse failed: {}", msg),
            Self::Closed => write!(f, "parse failed: stream closed before a status response was found"),
            Self::Resolve(host) => write!(f, "No addresses found for {}", host),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
