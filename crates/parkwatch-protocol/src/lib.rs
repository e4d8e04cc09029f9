//! parkwatch protocol - wire format for occupancy push
//!
//! Newline-delimited JSON over TCP. The daemon pushes the full occupancy
//! map as a `parking_update` message on connect and on every change;
//! clients may send `ping` and `disconnect`.

pub mod message;
pub mod version;

pub use message::{ClientMessage, DaemonMessage, MessageType};
pub use version::ProtocolVersion;

/// Parses one line received from the daemon.
pub fn decode_daemon_line(line: &str) -> Result<DaemonMessage, serde_json::Error> {
    serde_json::from_str(line.trim_end())
}

/// Renders a message as a single newline-terminated line.
pub fn encode_line<T: serde::Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string(message)?;
    json.push('\n');
    Ok(json)
}
