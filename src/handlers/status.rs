// src/handlers/status.rs
use actix_web::{web, HttpRequest, HttpResponse};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::RateLimiter;
use log::{debug, error, info};
use serde::Deserialize;
use std::net::IpAddr;

use crate::config::Config;
use crate::resolver::StatusResolver;
use crate::storage::memory::StatusCache;
use crate::utils::{client_ip, validate_host, RequestError};

pub type StatusRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    host: Option<String>,
    port: Option<u16>,
}

/// Always answers 200 with a status body; an unreachable server is reported
/// as `online: false`, not as an HTTP error.
pub async fn get_status(
    req: HttpRequest,
    query: web::Query<StatusQuery>,
    config: web::Data<Config>,
    cache: web::Data<StatusCache>,
    resolver: web::Data<StatusResolver>,
    rate_limiter: web::Data<StatusRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = client_ip(&req)?;

    if rate_limiter.check_key(&peer_ip).is_err() {
        error!("Rate limit exceeded for status for ip: {}", peer_ip);
        return Err(RequestError::RateLimitExceeded);
    }

    let (host, port) = select_target(&config, &query)?;
    let key = StatusCache::key(host, port);

    if let Some(status) = cache.get_fresh(&key) {
        debug!("Serving cached status for {}", key);
        return Ok(HttpResponse::Ok().json(status));
    }

    let status = resolver.resolve(host, port).await;
    info!(
        "Status for {}: online={} players={}/{}",
        key, status.online, status.numplayers, status.maxplayers
    );

    cache.cleanup_stale();
    cache.insert(key, status.clone());

    Ok(HttpResponse::Ok().json(status))
}

fn select_target<'a>(
    config: &'a Config,
    query: &'a StatusQuery,
) -> Result<(&'a str, u16), RequestError> {
    let host = match query.host.as_deref() {
        Some(host) => validate_host(host)?,
        None => config.mc_server_host.as_str(),
    };
    let port = query.port.unwrap_or(config.mc_server_port);

    let overridden = host != config.mc_server_host || port != config.mc_server_port;
    if overridden && !config.allow_target_override {
        debug!("Rejected status target override {}:{}", host, port);
        return Err(RequestError::TargetOverrideDisabled);
    }
    Ok((host, port))
}
