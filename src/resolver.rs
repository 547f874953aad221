// src/resolver.rs
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

use crate::error::ProbeError;
use crate::models::status::ServerStatus;
use crate::protocol::{ping, query};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// One way of asking a server for its status.
pub trait StatusProbe {
    fn name(&self) -> &'static str;

    fn probe(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<ServerStatus, ProbeError>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PingProbe;

impl StatusProbe for PingProbe {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn probe(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<ServerStatus, ProbeError> {
        ping::ping_server(host, port, timeout).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryProbe;

impl StatusProbe for QueryProbe {
    fn name(&self) -> &'static str {
        "query"
    }

    async fn probe(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<ServerStatus, ProbeError> {
        query::query_server(host, port, timeout).await
    }
}

/// Tries Server List Ping first, then Query, then reports the server offline.
/// The two probes run one after the other, never together.
pub struct StatusResolver<P = PingProbe, Q = QueryProbe> {
    ping: P,
    query: Q,
    timeout: Duration,
}

impl StatusResolver {
    pub fn new(timeout: Duration) -> Self {
        Self::with_probes(PingProbe, QueryProbe, timeout)
    }
}

impl Default for StatusResolver {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl<P: StatusProbe, Q: StatusProbe> StatusResolver<P, Q> {
    pub fn with_probes(ping: P, query: Q, timeout: Duration) -> Self {
        Self { ping, query, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn resolve(&self, host: &str, port: u16) -> ServerStatus {
        match self.ping.probe(host, port, self.timeout).await {
            Ok(status) => return status,
            Err(e) => debug!("{} probe of {}:{} failed: {}", self.ping.name(), host, port, e),
        }

        match self.query.probe(host, port, self.timeout).await {
            Ok(status) => return status,
            Err(e) => debug!("{} probe of {}:{} failed: {}", self.query.name(), host, port, e),
        }

        warn!("{}:{} did not answer any status probe", host, port);
        ServerStatus::offline()
    }
}

/// Status of `host:port` with the default 3 second timeout per probe.
pub async fn get_server_status(host: &str, port: u16) -> ServerStatus {
    let resolver: StatusResolver = StatusResolver::new(DEFAULT_TIMEOUT);
    resolver.resolve(host, port).await
}
