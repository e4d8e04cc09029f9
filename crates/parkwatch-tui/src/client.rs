//! Daemon connection client for the parkwatch board.
//!
//! This module provides the `BoardClient` which handles:
//! - Connection to the daemon over TCP
//! - Automatic reconnection with capped exponential backoff
//! - Forwarding pushed occupancy maps to the board's event loop
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TuiError};
use crate::input::Event;
use parkwatch_protocol::{decode_daemon_line, encode_line, ClientMessage, DaemonMessage, ProtocolVersion};

/// Name the board announces in its `connect` message.
const CLIENT_NAME: &str = "parkwatch-board";

// ============================================================================
// Configuration
// ============================================================================

/// Connection behavior for the board client.
///
/// # Example
///
/// ```rust
/// use parkwatch_tui::client::BoardClientConfig;
/// use std::time::Duration;
///
/// let config = BoardClientConfig {
///     addr: "10.0.0.5:5000".to_string(),
///     retry_initial_delay: Duration::from_millis(500),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct BoardClientConfig {
    /// Daemon address (`host:port`).
    pub addr: String,

    /// Initial delay before first retry after connection failure.
    pub retry_initial_delay: Duration,

    /// Maximum delay between retry attempts.
    pub retry_max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each retry).
    pub retry_multiplier: f64,
}

impl Default for BoardClientConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
            retry_initial_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            retry_multiplier: 2.0,
        }
    }
}

impl BoardClientConfig {
    /// Delay to use after `delay`, capped at `retry_max_delay`.
    fn next_delay(&self, delay: Duration) -> Duration {
        let next_ms = (delay.as_millis() as f64 * self.retry_multiplier) as u64;
        Duration::from_millis(next_ms).min(self.retry_max_delay)
    }
}

// ============================================================================
// Board Client
// ============================================================================

/// Client keeping the board subscribed to the daemon.
///
/// # Connection Lifecycle
///
/// 1. Connect to the daemon's TCP address, retrying with backoff
/// 2. Send `connect` and wait for `connected`, checking protocol version
/// 3. Forward every `parking_update` to the board as [`Event::Update`]
/// 4. On disconnect, notify the board and retry
pub struct BoardClient {
    config: BoardClientConfig,

    /// Channel to send events to the board.
    event_tx: mpsc::UnboundedSender<Event>,

    cancel_token: CancellationToken,
}

impl BoardClient {
    #[must_use]
    pub fn new(
        config: BoardClientConfig,
        event_tx: mpsc::UnboundedSender<Event>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            event_tx,
            cancel_token,
        }
    }

    /// Main loop that maintains the subscription until cancelled.
    pub async fn run(&self) {
        info!(addr = %self.config.addr, "Board client starting");

        loop {
            if self.cancel_token.is_cancelled() {
                info!("Board client shutting down (cancelled)");
                return;
            }

            match self.connect_with_retry().await {
                Ok(stream) => {
                    info!(addr = %self.config.addr, "Connected to daemon");

                    if let Err(e) = self.handle_connection(stream).await {
                        warn!(error = %e, "Connection ended with error");
                    }

                    // Ignore: the board may already be shutting down
                    let _ = self.event_tx.send(Event::DaemonDisconnected);
                }
                Err(e) => {
                    if !self.cancel_token.is_cancelled() {
                        error!(error = %e, "Failed to connect to daemon");
                    }
                }
            }

            if self.cancel_token.is_cancelled() {
                info!("Board client shutting down (cancelled)");
                return;
            }

            // Pause before reconnecting so a daemon that accepts and
            // immediately drops does not cause a busy loop.
            tokio::select! {
                _ = sleep(self.config.retry_initial_delay) => {}
                _ = self.cancel_token.cancelled() => return,
            }
        }
    }

    /// Connects to the daemon, retrying with exponential backoff until
    /// successful or cancelled.
    async fn connect_with_retry(&self) -> Result<TcpStream> {
        let mut delay = self.config.retry_initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);
            debug!(attempt, addr = %self.config.addr, "Attempting to connect to daemon");

            match TcpStream::connect(&self.config.addr).await {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(error = %e, "Failed to set TCP_NODELAY");
                    }
                    debug!(attempt, "Connection successful");
                    return Ok(stream);
                }
                Err(e) if attempt == 1 => {
                    warn!(addr = %self.config.addr, error = %e, "Daemon not reachable, will retry");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Connection attempt failed");
                }
            }

            tokio::select! {
                _ = sleep(delay) => {
                    delay = self.config.next_delay(delay);
                }
                _ = self.cancel_token.cancelled() => {
                    info!("Connection retry cancelled");
                    return Err(TuiError::DaemonConnection("cancelled".to_string()));
                }
            }
        }
    }

    /// Performs the handshake, then forwards updates until disconnect.
    async fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let connect = ClientMessage::connect(Some(CLIENT_NAME.to_string()));
        writer.write_all(encode_line(&connect)?.as_bytes()).await?;
        writer.flush().await?;

        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(TuiError::DaemonConnection(
                "daemon closed the connection during handshake".to_string(),
            ));
        }

        match decode_daemon_line(&line)? {
            DaemonMessage::Connected {
                protocol_version,
                client_id,
            } => {
                if !ProtocolVersion::CURRENT.is_compatible_with(&protocol_version) {
                    return Err(TuiError::VersionMismatch {
                        client_version: ProtocolVersion::CURRENT.to_string(),
                        daemon_version: protocol_version.to_string(),
                    });
                }
                info!(client_id, protocol_version = %protocol_version, "Handshake complete");
                // Ignore: the board may already be shutting down
                let _ = self.event_tx.send(Event::DaemonConnected { client_id });
            }
            DaemonMessage::Rejected {
                protocol_version, ..
            } => {
                return Err(TuiError::VersionMismatch {
                    client_version: ProtocolVersion::CURRENT.to_string(),
                    daemon_version: protocol_version.to_string(),
                });
            }
            other => {
                return Err(TuiError::ProtocolError(format!(
                    "Unexpected first message from daemon: {other:?}"
                )));
            }
        }

        self.message_loop(&mut reader).await
    }

    /// Reads pushed messages until EOF, error or cancellation.
    async fn message_loop<R>(&self, reader: &mut R) -> Result<()>
    where
        R: AsyncBufReadExt + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            tokio::select! {
                read_result = reader.read_line(&mut line) => {
                    match read_result {
                        Ok(0) => {
                            info!("Daemon closed connection");
                            return Ok(());
                        }
                        Ok(_) => {
                            if let Err(e) = self.handle_message(&line) {
                                // A single bad line does not end the subscription
                                warn!(error = %e, line = %line.trim(), "Failed to handle message");
                            }
                        }
                        Err(e) => return Err(TuiError::Io(e)),
                    }
                }

                _ = self.cancel_token.cancelled() => {
                    debug!("Message loop cancelled");
                    return Ok(());
                }
            }
        }
    }

    /// Handles a single message from the daemon.
    fn handle_message(&self, line: &str) -> Result<()> {
        match decode_daemon_line(line)? {
            DaemonMessage::ParkingUpdate { status } => {
                debug!(
                    zones = status.len(),
                    occupied = status.occupied_count(),
                    "Received parking update"
                );
                // Ignore: the board may already be shutting down
                let _ = self.event_tx.send(Event::Update(status));
            }
            DaemonMessage::Pong { seq } => {
                debug!(seq, "Received pong");
            }
            DaemonMessage::Error { message, code } => {
                warn!(error_message = %message, error_code = ?code, "Received error from daemon");
            }
            DaemonMessage::Connected { .. } | DaemonMessage::Rejected { .. } => {
                warn!("Received unexpected handshake message after connection");
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_core::{OccupancyMap, ZoneId, ZoneState};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

    fn sample_map() -> OccupancyMap {
        OccupancyMap::from_entries([
            (ZoneId::numbered(1), ZoneState::Occupied),
            (ZoneId::numbered(2), ZoneState::Free),
        ])
    }

    /// Accepts one connection and writes `lines` to it, then closes.
    async fn fake_daemon(lines: Vec<DaemonMessage>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            for msg in lines {
                writer
                    .write_all(encode_line(&msg).unwrap().as_bytes())
                    .await
                    .unwrap();
            }
            // Wait for the client's connect line before closing
            let mut line = String::new();
            let _ = BufReader::new(reader).read_line(&mut line).await;
        });
        addr
    }

    fn client(addr: String) -> (BoardClient, mpsc::UnboundedReceiver<Event>, CancellationToken) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let config = BoardClientConfig {
            addr,
            retry_initial_delay: Duration::from_millis(20),
            retry_max_delay: Duration::from_millis(100),
            retry_multiplier: 2.0,
        };
        (BoardClient::new(config, tx, cancel.clone()), rx, cancel)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        timeout(EVENT_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[test]
    fn test_config_default() {
        let config = BoardClientConfig::default();
        assert_eq!(config.addr, "127.0.0.1:5000");
        assert_eq!(config.retry_initial_delay, Duration::from_secs(1));
        assert_eq!(config.retry_max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = BoardClientConfig::default();
        assert_eq!(config.next_delay(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(config.next_delay(Duration::from_secs(20)), Duration::from_secs(30));
        assert_eq!(config.next_delay(Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_forwards_connect_update_and_disconnect() {
        let addr = fake_daemon(vec![
            DaemonMessage::connected("client-0".to_string()),
            DaemonMessage::parking_update(sample_map()),
        ])
        .await;
        let (client, mut rx, cancel) = client(addr);
        let task = tokio::spawn(async move { client.run().await });

        match next_event(&mut rx).await {
            Event::DaemonConnected { client_id } => assert_eq!(client_id, "client-0"),
            other => panic!("Expected DaemonConnected, got {other:?}"),
        }
        match next_event(&mut rx).await {
            Event::Update(map) => assert_eq!(map, sample_map()),
            other => panic!("Expected Update, got {other:?}"),
        }
        assert!(matches!(next_event(&mut rx).await, Event::DaemonDisconnected));

        cancel.cancel();
        timeout(EVENT_TIMEOUT, task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bad_line_does_not_end_subscription() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let connected = encode_line(&DaemonMessage::connected("c".to_string())).unwrap();
            let update = encode_line(&DaemonMessage::parking_update(sample_map())).unwrap();
            let payload = format!("{connected}garbage\n{update}");
            stream.write_all(payload.as_bytes()).await.unwrap();
            sleep(Duration::from_millis(200)).await;
        });

        let (client, mut rx, cancel) = client(addr);
        let task = tokio::spawn(async move { client.run().await });

        assert!(matches!(next_event(&mut rx).await, Event::DaemonConnected { .. }));
        assert!(matches!(next_event(&mut rx).await, Event::Update(_)));

        cancel.cancel();
        timeout(EVENT_TIMEOUT, task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_incompatible_daemon_version_rejected() {
        let addr = fake_daemon(vec![DaemonMessage::Connected {
            protocol_version: ProtocolVersion::new(9, 0),
            client_id: "client-0".to_string(),
        }])
        .await;
        let (client, _rx, _cancel) = client(addr.clone());
        let stream = TcpStream::connect(&addr).await.unwrap();

        let err = client.handle_connection(stream).await.unwrap_err();
        assert!(matches!(err, TuiError::VersionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_retry_cancelled_when_daemon_absent() {
        // Bind and drop to get a port with nothing listening
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let (client, _rx, cancel) = client(addr);
        let task = tokio::spawn(async move { client.run().await });

        sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        timeout(EVENT_TIMEOUT, task).await.unwrap().unwrap();
    }
}
