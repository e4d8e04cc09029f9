//! Protocol message types for occupancy push.

use crate::version::ProtocolVersion;
use parkwatch_core::OccupancyMap;
use serde::{Deserialize, Serialize};

/// Message types that can be sent by clients to the daemon.
///
/// Clients never change occupancy; the channel is push-only apart from
/// liveness and a polite goodbye.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageType {
    /// Client announces itself (optional; the daemon pushes state regardless)
    Connect {
        #[serde(skip_serializing_if = "Option::is_none")]
        client_name: Option<String>,
    },

    /// Ping to check connection
    Ping {
        /// Sequence number for matching pong response
        seq: u64,
    },

    /// Client disconnecting gracefully
    Disconnect,
}

/// Messages sent from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Protocol version
    pub protocol_version: ProtocolVersion,

    /// Message payload
    #[serde(flatten)]
    pub message: MessageType,
}

impl ClientMessage {
    /// Creates a new client message with current protocol version.
    pub fn new(message: MessageType) -> Self {
        Self {
            protocol_version: ProtocolVersion::CURRENT,
            message,
        }
    }

    /// Creates a connect message.
    pub fn connect(client_name: Option<String>) -> Self {
        Self::new(MessageType::Connect { client_name })
    }

    /// Creates a ping message.
    pub fn ping(seq: u64) -> Self {
        Self::new(MessageType::Ping { seq })
    }

    /// Creates a disconnect message.
    pub fn disconnect() -> Self {
        Self::new(MessageType::Disconnect)
    }
}

/// Messages sent from daemon to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonMessage {
    /// Connection accepted
    Connected {
        /// Daemon's protocol version
        protocol_version: ProtocolVersion,
        /// Assigned client ID
        client_id: String,
    },

    /// Connection rejected (version mismatch)
    Rejected {
        /// Reason for rejection
        reason: String,
        /// Daemon's protocol version (for client to upgrade)
        protocol_version: ProtocolVersion,
    },

    /// Full occupancy map, sent on connect and on every change
    ParkingUpdate {
        /// Zone id to "free" / "occupied", in registry order
        status: OccupancyMap,
    },

    /// Pong response to ping
    Pong {
        /// Sequence number from ping
        seq: u64,
    },

    /// Error response
    Error {
        /// Error message
        message: String,
        /// Error code (optional)
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl DaemonMessage {
    /// Creates a connected response.
    pub fn connected(client_id: String) -> Self {
        Self::Connected {
            protocol_version: ProtocolVersion::CURRENT,
            client_id,
        }
    }

    /// Creates a rejected response.
    pub fn rejected(reason: &str) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
            protocol_version: ProtocolVersion::CURRENT,
        }
    }

    /// Creates an occupancy update.
    pub fn parking_update(status: OccupancyMap) -> Self {
        Self::ParkingUpdate { status }
    }

    /// Creates a pong response.
    pub fn pong(seq: u64) -> Self {
        Self::Pong { seq }
    }

    /// Creates an error response with code.
    pub fn error_with_code(message: &str, code: &str) -> Self {
        Self::Error {
            message: message.to_string(),
            code: Some(code.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_core::{ZoneId, ZoneState};

    #[test]
    fn test_client_message_serialization() {
        let msg = ClientMessage::ping(42);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"ping\""));
        assert!(json.contains("\"seq\":42"));
        assert!(json.contains("\"protocol_version\""));
    }

    #[test]
    fn test_parking_update_wire_shape() {
        let map = OccupancyMap::from_entries(vec![
            (ZoneId::new("Zone 1"), ZoneState::Occupied),
            (ZoneId::new("Zone 2"), ZoneState::Free),
        ]);
        let json = serde_json::to_string(&DaemonMessage::parking_update(map)).unwrap();
        assert_eq!(
            json,
            r#"{"type":"parking_update","status":{"Zone 1":"occupied","Zone 2":"free"}}"#
        );
    }

    #[test]
    fn test_parking_update_parses() {
        let msg: DaemonMessage =
            serde_json::from_str(r#"{"type":"parking_update","status":{"Zone 1":"free"}}"#)
                .unwrap();
        match msg {
            DaemonMessage::ParkingUpdate { status } => {
                assert_eq!(status.get(&ZoneId::new("Zone 1")), Some(ZoneState::Free));
            }
            other => panic!("Expected ParkingUpdate, got {other:?}"),
        }
    }

    #[test]
    fn test_daemon_message_serialization() {
        let msg = DaemonMessage::connected("client-123".to_string());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"client_id\":\"client-123\""));
    }

    #[test]
    fn test_connect_without_name_omits_field() {
        let json = serde_json::to_string(&ClientMessage::connect(None)).unwrap();
        assert!(!json.contains("client_name"));
        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.message, MessageType::Connect { client_name: None });
    }

    #[test]
    fn test_error_with_code() {
        let json = serde_json::to_string(&DaemonMessage::error_with_code("bad", "parse")).unwrap();
        assert!(json.contains("\"code\":\"parse\""));
    }
}
