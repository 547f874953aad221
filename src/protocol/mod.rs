pub mod buffer;
pub mod ping;
pub mod query;

use std::net::SocketAddr;
use tokio::net::lookup_host;

use crate::error::ProbeError;

/// First address `host:port` resolves to. DNS failures surface as I/O errors.
pub(crate) async fn resolve_target(host: &str, port: u16) -> Result<SocketAddr, ProbeError> {
    lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| ProbeError::Resolve(host.to_string()))
}
