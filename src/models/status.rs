// src/models/status.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PORT: u16 = 25565;
pub const DEFAULT_HOSTNAME: &str = "Minecraft Server";
pub const DEFAULT_VERSION: &str = "Unknown";
pub const DEFAULT_NUM_PLAYERS: u32 = 0;
pub const DEFAULT_MAX_PLAYERS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub online: bool,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gametype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    pub numplayers: u32,
    pub maxplayers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostport: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerStatus {
    /// An online status with only the fields every probe can report.
    pub fn online(hostname: String, numplayers: u32, maxplayers: u32) -> Self {
        Self {
            online: true,
            hostname,
            gametype: None,
            version: None,
            map: None,
            numplayers,
            maxplayers,
            hostport: None,
            players: None,
            error: None,
        }
    }

    /// What callers see when every probe failed.
    pub fn offline() -> Self {
        Self {
            online: false,
            hostname: "Server".to_string(),
            gametype: None,
            version: None,
            map: None,
            numplayers: 0,
            maxplayers: 0,
            hostport: None,
            players: None,
            error: Some("Server unreachable".to_string()),
        }
    }

    pub fn with_players(mut self, names: Vec<String>) -> Self {
        self.players = if names.is_empty() { None } else { Some(names) };
        self
    }
}

/// Player counts come from text fields or loosely typed JSON; anything that
/// is not a whole number in range falls back to `default`.
pub fn parse_count(raw: &str, default: u32) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(default)
}

pub fn count_from_json(value: Option<&Value>, default: u32) -> u32 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default),
        Some(Value::String(s)) => parse_count(s, default),
        _ => default,
    }
}

pub fn parse_port(raw: &str, default: u16) -> u16 {
    raw.trim().parse::<u16>().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_counts_use_defaults() {
        for raw in ["", "abc", "-3", "3.5", "NaN", "99999999999"] {
            assert_eq!(parse_count(raw, 20), 20, "input {:?}", raw);
        }
        assert_eq!(parse_count(" 7 ", 0), 7);
    }

    #[test]
    fn json_counts_use_defaults() {
        assert_eq!(count_from_json(Some(&json!(5)), 0), 5);
        assert_eq!(count_from_json(Some(&json!("12")), 0), 12);
        assert_eq!(count_from_json(Some(&json!(-1)), 20), 20);
        assert_eq!(count_from_json(Some(&json!(1.5)), 20), 20);
        assert_eq!(count_from_json(Some(&json!(null)), 20), 20);
        assert_eq!(count_from_json(None, 0), 0);
    }

    #[test]
    fn offline_shape_serializes_without_optional_fields() {
        let value = serde_json::to_value(ServerStatus::offline()).unwrap();
        assert_eq!(
            value,
            json!({
                "online": false,
                "hostname": "Server",
                "numplayers": 0,
                "maxplayers": 0,
                "error": "Server unreachable"
            })
        );
    }
}
