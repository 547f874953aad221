// src/protocol/query.rs
//! GameSpot/UT3 "Query" protocol over UDP: handshake for a challenge token,
//! then a full-stat request answered with NUL-separated key/value text.

use log::{debug, trace};
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::UdpSocket;

use crate::error::ProbeError;
use crate::models::status::{
    parse_count, parse_port, ServerStatus, DEFAULT_HOSTNAME, DEFAULT_MAX_PLAYERS,
    DEFAULT_NUM_PLAYERS, DEFAULT_PORT, DEFAULT_VERSION,
};
use crate::protocol::buffer::{PacketReader, PacketWriter};
use crate::protocol::resolve_target;

pub const MAGIC: u16 = 0xFEFD;
pub const TYPE_HANDSHAKE: u8 = 0x09;
pub const TYPE_STAT: u8 = 0x00;

/// Servers only look at the low nibble of each session byte.
pub const SESSION_MASK: u32 = 0x0F0F_0F0F;

/// Type byte, session echo and the constant "splitnum" padding block.
const FULL_STAT_HEADER_LEN: usize = 16;
const PLAYER_SECTION_MARKER: &str = "\u{1}player_";
const MAX_DATAGRAM: usize = 65_507;

const DEFAULT_GAMETYPE: &str = "SMP";
const DEFAULT_MAP: &str = "world";

pub fn new_session_id() -> i32 {
    (rand::thread_rng().gen::<u32>() & SESSION_MASK) as i32
}

pub fn encode_handshake(session_id: i32) -> Vec<u8> {
    let mut packet = PacketWriter::with_capacity(7);
    packet
        .put_u16_be(MAGIC)
        .put_u8(TYPE_HANDSHAKE)
        .put_i32_be(session_id);
    packet.into_inner()
}

/// The four trailing zero bytes ask for the full stat instead of the basic one.
pub fn encode_full_stat_request(session_id: i32, challenge_token: i32) -> Vec<u8> {
    let mut packet = PacketWriter::with_capacity(15);
    packet
        .put_u16_be(MAGIC)
        .put_u8(TYPE_STAT)
        .put_i32_be(session_id)
        .put_i32_be(challenge_token)
        .put_bytes(&[0x00; 4]);
    packet.into_inner()
}

/// Reads the ASCII decimal token that follows the type byte and session echo.
pub fn parse_challenge_token(datagram: &[u8]) -> Result<i32, ProbeError> {
    let mut reader = PacketReader::new(datagram);
    reader.skip(5)?;
    let digits = reader.get_cstring_or_rest();
    let text = std::str::from_utf8(digits)
        .map_err(|_| ProbeError::parse("challenge token is not ASCII"))?
        .trim();

    // Tokens are printed as signed ints by most servers, unsigned by a few.
    text.parse::<i32>()
        .or_else(|_| text.parse::<u32>().map(|token| token as i32))
        .map_err(|_| ProbeError::parse(format!("invalid challenge token {:?}", text)))
}

pub fn parse_full_stat(datagram: &[u8]) -> Result<ServerStatus, ProbeError> {
    let mut reader = PacketReader::new(datagram);
    reader
        .skip(FULL_STAT_HEADER_LEN)
        .map_err(|_| ProbeError::parse(format!("full stat reply too short ({} bytes)", datagram.len())))?;

    let text = String::from_utf8_lossy(reader.rest());
    let mut tokens = text.split('\0');

    let mut fields: HashMap<&str, &str> = HashMap::new();
    loop {
        let key = match tokens.next() {
            Some(key) if !key.is_empty() => key,
            _ => break,
        };
        fields.insert(key, tokens.next().unwrap_or(""));
    }

    let players: Vec<String> = match tokens.next() {
        Some(PLAYER_SECTION_MARKER) => {
            // An empty token separates the marker from the names.
            tokens.next();
            tokens
                .take_while(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        }
        _ => Vec::new(),
    };

    let text_field = |key: &str, default: &str| -> String {
        fields
            .get(key)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
            .unwrap_or_else(|| default.to_string())
    };
    let raw = |key: &str| fields.get(key).copied().unwrap_or("");

    let mut status = ServerStatus::online(
        text_field("hostname", DEFAULT_HOSTNAME),
        parse_count(raw("numplayers"), DEFAULT_NUM_PLAYERS),
        parse_count(raw("maxplayers"), DEFAULT_MAX_PLAYERS),
    );
    status.gametype = Some(text_field("gametype", DEFAULT_GAMETYPE));
    status.version = Some(text_field("version", DEFAULT_VERSION));
    status.map = Some(text_field("map", DEFAULT_MAP));
    status.hostport = Some(parse_port(raw("hostport"), DEFAULT_PORT));

    Ok(status.with_players(players))
}

/// Full-stat query of `host:port`. The socket lives inside the exchange
/// future, so a timeout drops and closes it exactly once.
pub async fn query_server(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<ServerStatus, ProbeError> {
    match tokio::time::timeout(timeout, query_exchange(host, port)).await {
        Ok(result) => result,
        Err(_) => {
            debug!("Query to {}:{} timed out after {:?}", host, port, timeout);
            Err(ProbeError::Timeout(timeout))
        }
    }
}

async fn query_exchange(host: &str, port: u16) -> Result<ServerStatus, ProbeError> {
    let target = resolve_target(host, port).await?;
    let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind_addr).await?;
    socket.connect(target).await?;

    let session_id = new_session_id();
    socket.send(&encode_handshake(session_id)).await?;
    debug!("Query handshake sent to {} with session {:#010x}", target, session_id);

    let mut buffer = vec![0u8; MAX_DATAGRAM];
    loop {
        let len = socket.recv(&mut buffer).await?;
        let datagram = &buffer[..len];

        match datagram.first() {
            Some(&TYPE_HANDSHAKE) => {
                let token = parse_challenge_token(datagram)?;
                trace!("Challenge token {} from {}", token, target);
                socket
                    .send(&encode_full_stat_request(session_id, token))
                    .await?;
            }
            Some(&TYPE_STAT) => {
                let status = parse_full_stat(datagram)?;
                debug!(
                    "Query reply from {}: {} ({}/{})",
                    target, status.hostname, status.numplayers, status.maxplayers
                );
                return Ok(status);
            }
            other => {
                trace!("Ignoring datagram from {} with type {:?}", target, other);
            }
        }
    }
}
