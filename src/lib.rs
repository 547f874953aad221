//! Minecraft server status probing over Server List Ping (TCP) and the
//! GameSpot/UT3 Query protocol (UDP), plus the small HTTP service that
//! exposes the result.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod protocol;
pub mod resolver;
pub mod storage;
pub mod utils;

pub use error::ProbeError;
pub use models::status::ServerStatus;
pub use protocol::ping::ping_server;
pub use protocol::query::query_server;
pub use resolver::{get_server_status, StatusResolver};
