//! Connection handler for individual subscriber connections.
//!
//! Each connection gets its own `ConnectionHandler` that:
//! - Queues a `connected` greeting, then registers with the hub (which
//!   queues the current occupancy map right behind it)
//! - Spawns a writer task draining the connection's outbox to the socket
//! - Reads optional client messages (`connect`, `ping`, `disconnect`)
//! - Unsubscribes from the hub when either side goes away
//!
//! Subscribers are push-only, so an idle client is never timed out on the
//! read side. A client that stops reading is caught by the write timeout or
//! by its outbox filling up.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Connection errors are logged and result in graceful disconnect

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parkwatch_protocol::{encode_line, ClientMessage, DaemonMessage, MessageType, ProtocolVersion};

use crate::hub::{HubHandle, OUTBOX_CAPACITY};

/// Maximum message size (64 KB)
const MAX_MESSAGE_SIZE: usize = 65_536;

/// Write timeout (10 seconds)
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection handler for a single subscriber.
pub struct ConnectionHandler {
    /// Buffered reader for incoming messages
    reader: BufReader<OwnedReadHalf>,

    /// Write half, handed to the writer task on start
    writer: Option<OwnedWriteHalf>,

    peer: SocketAddr,

    /// Handle to the broadcast hub
    hub: HubHandle,

    cancel_token: CancellationToken,

    /// Unique client identifier
    client_id: String,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        hub: HubHandle,
        cancel_token: CancellationToken,
        connection_number: u64,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer: Some(writer),
            peer,
            hub,
            cancel_token,
            client_id: format!("client-{connection_number}"),
        }
    }

    /// Returns the client ID.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Runs the connection until the client leaves, the writer fails, or
    /// the server shuts down.
    pub async fn run(mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        let (outbox, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);
        let writer_task = spawn_writer(writer, outbox_rx, self.client_id.clone());

        if outbox
            .send(DaemonMessage::connected(self.client_id.clone()))
            .await
            .is_err()
        {
            return;
        }

        if let Err(e) = self.hub.subscribe(self.client_id.clone(), outbox.clone()).await {
            warn!(client_id = %self.client_id, error = %e, "Subscription failed");
            drop(outbox);
            finish_writer(writer_task, &self.client_id).await;
            return;
        }

        info!(client_id = %self.client_id, peer = %self.peer, "Subscriber connected");

        if let Err(e) = self.process_messages(&outbox).await {
            debug!(client_id = %self.client_id, error = %e, "Connection closed");
        }

        self.hub.unsubscribe(&self.client_id);
        drop(outbox);
        finish_writer(writer_task, &self.client_id).await;

        info!(client_id = %self.client_id, "Subscriber disconnected");
    }

    /// Main message processing loop.
    async fn process_messages(
        &mut self,
        outbox: &mpsc::Sender<DaemonMessage>,
    ) -> Result<(), ConnectionError> {
        let cancel = self.cancel_token.clone();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => None,
                _ = outbox.closed() => return Err(ConnectionError::WriterClosed),
                result = self.read_message() => Some(result),
            };

            let Some(msg) = next else {
                debug!(client_id = %self.client_id, "Closing connection for shutdown");
                return Ok(());
            };

            let msg = match msg {
                Ok(msg) => msg,
                Err(ConnectionError::Eof) => {
                    debug!(client_id = %self.client_id, "Client sent EOF");
                    return Ok(());
                }
                Err(e @ ConnectionError::ParseError(_)) => {
                    // Malformed input is reported but does not end the session
                    send(outbox, DaemonMessage::error_with_code(&e.to_string(), "parse")).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if !msg.protocol_version.is_compatible_with(&ProtocolVersion::CURRENT) {
                warn!(
                    client_id = %self.client_id,
                    client_version = %msg.protocol_version,
                    server_version = %ProtocolVersion::CURRENT,
                    "Protocol version mismatch"
                );
                send(
                    outbox,
                    DaemonMessage::rejected(&format!(
                        "Protocol version {} not compatible with server version {}",
                        msg.protocol_version,
                        ProtocolVersion::CURRENT
                    )),
                )
                .await?;
                return Err(ConnectionError::VersionMismatch {
                    client: msg.protocol_version,
                    server: ProtocolVersion::CURRENT,
                });
            }

            match msg.message {
                MessageType::Connect { client_name } => {
                    debug!(client_id = %self.client_id, name = ?client_name, "Client identified");
                }
                MessageType::Ping { seq } => {
                    send(outbox, DaemonMessage::pong(seq)).await?;
                }
                MessageType::Disconnect => {
                    debug!(client_id = %self.client_id, "Client requested disconnect");
                    return Ok(());
                }
            }
        }
    }

    /// Reads a single message from the client.
    async fn read_message(&mut self) -> Result<ClientMessage, ConnectionError> {
        let mut line = String::new();

        let bytes_read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;

        if bytes_read == 0 {
            return Err(ConnectionError::Eof);
        }

        if line.len() > MAX_MESSAGE_SIZE {
            return Err(ConnectionError::MessageTooLarge {
                size: line.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        serde_json::from_str(&line).map_err(|e| ConnectionError::ParseError(e.to_string()))
    }
}

async fn send(
    outbox: &mpsc::Sender<DaemonMessage>,
    msg: DaemonMessage,
) -> Result<(), ConnectionError> {
    outbox
        .send(msg)
        .await
        .map_err(|_| ConnectionError::WriterClosed)
}

fn spawn_writer(
    writer: OwnedWriteHalf,
    outbox: mpsc::Receiver<DaemonMessage>,
    client_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = write_outbox(writer, outbox).await {
            debug!(client_id = %client_id, error = %e, "Writer stopped");
        }
    })
}

/// Drains the outbox to the socket, one JSON line per message.
async fn write_outbox(
    writer: OwnedWriteHalf,
    mut outbox: mpsc::Receiver<DaemonMessage>,
) -> Result<(), ConnectionError> {
    let mut writer = BufWriter::new(writer);

    while let Some(msg) = outbox.recv().await {
        let line = encode_line(&msg).map_err(|e| ConnectionError::ParseError(e.to_string()))?;

        match timeout(WRITE_TIMEOUT, async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ConnectionError::Io(e.to_string())),
            Err(_) => return Err(ConnectionError::WriteTimeout),
        }
    }

    // Ignore: the peer may already have closed its end
    let _ = writer.shutdown().await;
    Ok(())
}

/// Lets the writer flush what is queued, bounded by the write timeout.
async fn finish_writer(task: JoinHandle<()>, client_id: &str) {
    if timeout(WRITE_TIMEOUT, task).await.is_err() {
        debug!(client_id = %client_id, "Writer did not finish in time");
    }
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Protocol version mismatch: client {client}, server {server}")]
    VersionMismatch {
        client: ProtocolVersion,
        server: ProtocolVersion,
    },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection closed")]
    Eof,

    #[error("Write timeout")]
    WriteTimeout,

    #[error("Writer closed")]
    WriterClosed,

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::VersionMismatch {
            client: ProtocolVersion::new(2, 0),
            server: ProtocolVersion::new(1, 0),
        };
        assert!(err.to_string().contains("2.0"));
        assert!(err.to_string().contains("1.0"));
    }

    #[test]
    fn test_message_size_error() {
        let err = ConnectionError::MessageTooLarge {
            size: 2_000_000,
            max: MAX_MESSAGE_SIZE,
        };
        assert!(err.to_string().contains("2000000"));
    }
}
