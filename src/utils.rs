// src/utils.rs
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use log::debug;
use std::fmt;
use std::net::IpAddr;

#[derive(Debug)]
pub enum RequestError {
    MissingPeerIP,
    RateLimitExceeded,
    TargetOverrideDisabled,
    InvalidHost(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPeerIP => write!(f, "Failed to extract client IP"),
            Self::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            Self::TargetOverrideDisabled => write!(f, "Custom status targets are disabled"),
            Self::InvalidHost(host) => write!(f, "Invalid host: {}", host),
        }
    }
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::RateLimitExceeded => HttpResponse::TooManyRequests().body(self.to_string()),
            Self::TargetOverrideDisabled => HttpResponse::Forbidden().body(self.to_string()),
            _ => HttpResponse::BadRequest().body(self.to_string()),
        }
    }
}

/// Client address used as the rate limiting key.
pub fn client_ip(req: &HttpRequest) -> Result<IpAddr, RequestError> {
    match req.peer_addr() {
        Some(addr) => Ok(addr.ip()),
        None => {
            debug!("Request to {} had no peer address", req.path());
            Err(RequestError::MissingPeerIP)
        }
    }
}

/// Hostnames and IP literals only; anything else is rejected before a socket
/// is opened.
pub fn validate_host(host: &str) -> Result<&str, RequestError> {
    let host = host.trim();
    let valid = !host.is_empty()
        && host.len() <= 253
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'));
    if valid {
        Ok(host)
    } else {
        Err(RequestError::InvalidHost(host.to_string()))
    }
}
