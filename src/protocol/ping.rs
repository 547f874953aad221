// src/protocol/ping.rs
//! Server List Ping over TCP. The status response is located by searching the
//! accumulated bytes for the JSON document instead of decoding the frame.

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::ProbeError;
use crate::models::status::{
    count_from_json, ServerStatus, DEFAULT_HOSTNAME, DEFAULT_MAX_PLAYERS, DEFAULT_NUM_PLAYERS,
    DEFAULT_VERSION,
};
use crate::protocol::buffer::PacketWriter;

const PACKET_HANDSHAKE: u8 = 0x00;
const PACKET_STATUS_REQUEST: u8 = 0x00;
/// Version 0 is accepted by every server for a status request.
const PROTOCOL_VERSION_ANY: i32 = 0;
const NEXT_STATE_STATUS: u8 = 0x01;
const MAX_RESPONSE_BYTES: usize = 1 << 20;

lazy_static! {
    static ref STATUS_JSON: Regex =
        Regex::new(r#"(?s)\{.*"players".*\}"#).expect("status JSON pattern compiles");
}

/// `description` is either a plain string or a chat component object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Description {
    Text(String),
    Component {
        #[serde(default)]
        text: Option<String>,
    },
    Other(IgnoredAny),
}

impl Description {
    fn into_text(self) -> Option<String> {
        match self {
            Description::Text(text) if !text.is_empty() => Some(text),
            Description::Component { text: Some(text) } if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PlayersInfo {
    #[serde(default)]
    online: Option<Value>,
    #[serde(default)]
    max: Option<Value>,
    #[serde(default)]
    sample: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    description: Option<Description>,
    #[serde(default)]
    version: Option<Value>,
    players: PlayersInfo,
}

impl StatusPayload {
    fn into_status(self) -> ServerStatus {
        let hostname = self
            .description
            .and_then(Description::into_text)
            .map(|text| strip_formatting(&text))
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());

        let version = self
            .version
            .as_ref()
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_VERSION.to_string());

        let names: Vec<String> = match &self.players.sample {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| entry.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let mut status = ServerStatus::online(
            hostname,
            count_from_json(self.players.online.as_ref(), DEFAULT_NUM_PLAYERS),
            count_from_json(self.players.max.as_ref(), DEFAULT_MAX_PLAYERS),
        );
        status.version = Some(version);
        status.with_players(names)
    }
}

/// Removes `§x` colour and style codes from a MOTD.
fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{a7}' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

pub fn encode_handshake(host: &str, port: u16) -> Vec<u8> {
    let mut body = PacketWriter::new();
    body.put_u8(PACKET_HANDSHAKE)
        .put_varint(PROTOCOL_VERSION_ANY)
        .put_string(host)
        .put_u16_be(port)
        .put_u8(NEXT_STATE_STATUS);
    body.into_frame()
}

pub fn encode_status_request() -> Vec<u8> {
    let mut body = PacketWriter::new();
    body.put_u8(PACKET_STATUS_REQUEST);
    body.into_frame()
}

/// Looks for a complete status document in whatever has arrived so far.
/// `None` means keep reading; a complete document with the wrong shape is an
/// error straight away.
fn extract_status(text: &str) -> Option<Result<StatusPayload, ProbeError>> {
    let found = STATUS_JSON.find(text)?;
    let span = found.as_str();
    let players_at = span.rfind("\"players\"")?;

    // Length prefixes can happen to be 0x7B, so try every brace up to the key.
    for (offset, _) in span[..players_at].match_indices('{') {
        let mut documents = serde_json::Deserializer::from_str(&span[offset..]).into_iter::<Value>();
        let document = match documents.next() {
            Some(Ok(document)) => document,
            // Truncated or not JSON at this brace.
            _ => continue,
        };
        if document.get("players").is_none() {
            continue;
        }
        return Some(
            serde_json::from_value::<StatusPayload>(document)
                .map_err(|e| ProbeError::parse(format!("unexpected status document: {}", e))),
        );
    }
    None
}

pub async fn ping_server(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<ServerStatus, ProbeError> {
    match tokio::time::timeout(timeout, ping_exchange(host, port)).await {
        Ok(result) => result,
        Err(_) => {
            debug!("Ping to {}:{} timed out after {:?}", host, port, timeout);
            Err(ProbeError::Timeout(timeout))
        }
    }
}

async fn ping_exchange(host: &str, port: u16) -> Result<ServerStatus, ProbeError> {
    let mut stream = TcpStream::connect((host, port)).await?;
    stream.write_all(&encode_handshake(host, port)).await?;
    stream.write_all(&encode_status_request()).await?;
    debug!("Status request sent to {}:{}", host, port);

    let mut response = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            debug!("{}:{} closed after {} bytes without a status document", host, port, response.len());
            return Err(ProbeError::Closed);
        }
        response.extend_from_slice(&chunk[..read]);
        trace!("Read {} bytes from {}:{} ({} total)", read, host, port, response.len());

        if let Some(payload) = extract_status(&String::from_utf8_lossy(&response)) {
            let status = payload?.into_status();
            debug!(
                "Ping reply from {}:{}: {} ({}/{})",
                host, port, status.hostname, status.numplayers, status.maxplayers
            );
            return Ok(status);
        }
        if response.len() > MAX_RESPONSE_BYTES {
            return Err(ProbeError::parse("status response exceeds 1 MiB"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_frame(json: &str) -> Vec<u8> {
        let mut body = PacketWriter::new();
        body.put_u8(0x00).put_string(json);
        body.into_frame()
    }

    fn extract(bytes: &[u8]) -> Option<ServerStatus> {
        extract_status(&String::from_utf8_lossy(bytes))
            .map(|payload| payload.expect("status document decodes").into_status())
    }

    #[test]
    fn handshake_layout_for_short_host() {
        let frame = encode_handshake("localhost", 25565);
        let mut expected = vec![15, 0x00, 0x00, 9];
        expected.extend_from_slice(b"localhost");
        expected.extend_from_slice(&[0x63, 0xDD, 0x01]);
        assert_eq!(frame, expected);
        assert_eq!(encode_status_request(), vec![0x01, 0x00]);
    }

    #[test]
    fn long_hosts_get_multi_byte_lengths() {
        let host = "a".repeat(200);
        let frame = encode_handshake(&host, 25565);
        // Body: id + version + 2-byte host length + host + port + state.
        let body_len = 1 + 1 + 2 + 200 + 2 + 1;
        assert_eq!(&frame[..2], &[(body_len & 0x7F) as u8 | 0x80, (body_len >> 7) as u8]);
        assert_eq!(&frame[2..6], &[0x00, 0x00, 0xC8, 0x01]);
        assert_eq!(frame.len(), 2 + body_len);
    }

    #[test]
    fn reads_plain_string_description() {
        let json = r#"{"version":{"name":"1.20.4","protocol":765},"players":{"max":50,"online":7},"description":"Hello"}"#;
        let status = extract(&response_frame(json)).unwrap();
        assert!(status.online);
        assert_eq!(status.hostname, "Hello");
        assert_eq!(status.version.as_deref(), Some("1.20.4"));
        assert_eq!(status.numplayers, 7);
        assert_eq!(status.maxplayers, 50);
        assert_eq!(status.gametype, None);
        assert_eq!(status.hostport, None);
    }

    #[test]
    fn reads_component_description_and_sample() {
        let json = r#"{"description":{"text":"§aGreen §lTown"},"players":{"max":20,"online":2,"sample":[{"name":"alice","id":"1"},{"name":"bob","id":"2"}]},"version":{"name":"Paper 1.21"}}"#;
        let status = extract(&response_frame(json)).unwrap();
        assert_eq!(status.hostname, "Green Town");
        assert_eq!(status.players, Some(vec!["alice".to_string(), "bob".to_string()]));
    }

    #[test]
    fn falls_back_to_defaults() {
        let json = r#"{"description":{"extra":[{"text":"x"}]},"players":{"online":"many","max":-5}}"#;
        let status = extract(&response_frame(json)).unwrap();
        assert_eq!(status.hostname, "Minecraft Server");
        assert_eq!(status.version.as_deref(), Some("Unknown"));
        assert_eq!(status.numplayers, 0);
        assert_eq!(status.maxplayers, 20);

        let json = r#"{"description":"","players":{}}"#;
        let status = extract(&response_frame(json)).unwrap();
        assert_eq!(status.hostname, "Minecraft Server");
    }

    #[test]
    fn incomplete_document_waits_for_more_data() {
        let json = r#"{"version":{"name":"1.8"},"players":{"max":10,"online":1},"description":{"text":"Split"}}"#;
        let frame = response_frame(json);
        let cut = frame.len() - 10;
        assert!(extract(&frame[..cut]).is_none());
        assert_eq!(extract(&frame).unwrap().hostname, "Split");
    }

    #[test]
    fn tolerates_brace_in_length_prefix() {
        // 0x7B is '{'; pad the description so the frame length byte is 0x7B.
        let base = r#"{"players":{"max":1,"online":0},"description":""}"#;
        let pad = 0x7B - 1 - 1 - base.len();
        let json = format!(
            r#"{{"players":{{"max":1,"online":0}},"description":"{}"}}"#,
            "m".repeat(pad)
        );
        let frame = response_frame(&json);
        assert_eq!(frame[0], b'{');
        let status = extract(&frame).unwrap();
        assert_eq!(status.hostname, "m".repeat(pad));
    }

    #[test]
    fn odd_version_shape_uses_default() {
        let json = r#"{"description":"Hi","players":{"max":5,"online":1},"version":"1.8"}"#;
        let status = extract(&response_frame(json)).unwrap();
        assert_eq!(status.hostname, "Hi");
        assert_eq!(status.version.as_deref(), Some("Unknown"));
        assert_eq!(status.numplayers, 1);
        assert_eq!(status.maxplayers, 5);
    }

    #[test]
    fn complete_document_with_bad_players_fails_at_once() {
        let json = r#"{"description":"Hi","players":"lots","version":{"name":"1.8"}}"#;
        let text = String::from_utf8_lossy(&response_frame(json)).into_owned();
        let err = extract_status(&text).unwrap().unwrap_err();
        assert!(err.is_parse_failure());
    }

    #[test]
    fn blank_motd_uses_default_name() {
        for description in [r#""   ""#, r#""\u00a7l  ""#, r#"{"text":" \t "}"#] {
            let json = format!(r#"{{"description":{},"players":{{"max":1,"online":0}}}}"#, description);
            let status = extract(&response_frame(&json)).unwrap();
            assert_eq!(status.hostname, "Minecraft Server", "description {}", description);
        }
        let json = r#"{"description":"  Padded  ","players":{}}"#;
        assert_eq!(extract(&response_frame(json)).unwrap().hostname, "  Padded  ");
    }

    #[test]
    fn no_status_document() {
        assert!(extract(b"\x05\x00garbage").is_none());
        assert!(extract(br#"{"version":{"name":"1.8"}}"#).is_none());
    }
}
