//! Client interface for interacting with the HubActor.
//!
//! # Panic-Free Guarantees
//!
//! Channel errors are mapped to `HubError::ChannelClosed` or logged.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use parkwatch_core::OccupancyMap;
use parkwatch_protocol::DaemonMessage;

use super::commands::{HubCommand, HubError};

/// Cheap-to-clone handle to the hub actor.
///
/// `send_update` and `unsubscribe` are synchronous and never block, so they
/// may be called from plain OS threads as well as from async tasks.
#[derive(Clone, Debug)]
pub struct HubHandle {
    sender: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    pub fn new(sender: mpsc::UnboundedSender<HubCommand>) -> Self {
        Self { sender }
    }

    /// Registers a subscriber. On success the current map has already been
    /// queued on `outbox`.
    ///
    /// # Errors
    ///
    /// - `HubError::AlreadySubscribed` if `client_id` is taken
    /// - `HubError::OutboxClosed` if the initial update could not be queued
    /// - `HubError::ChannelClosed` if the actor has shut down
    pub async fn subscribe(
        &self,
        client_id: String,
        outbox: mpsc::Sender<DaemonMessage>,
    ) -> Result<(), HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubCommand::Subscribe {
                client_id,
                outbox,
                respond_to: tx,
            })
            .map_err(|_| HubError::ChannelClosed)?;
        rx.await.map_err(|_| HubError::ChannelClosed)?
    }

    /// Removes a subscriber (fire-and-forget).
    pub fn unsubscribe(&self, client_id: &str) {
        let cmd = HubCommand::Unsubscribe {
            client_id: client_id.to_string(),
        };
        if self.sender.send(cmd).is_err() {
            debug!(client_id = %client_id, "Unsubscribe dropped: hub stopped");
        }
    }

    /// Queues a changed map for delivery. Returns `false` if the hub is gone.
    pub fn send_update(&self, occupancy: OccupancyMap, version: u64) -> bool {
        self.sender
            .send(HubCommand::Broadcast { occupancy, version })
            .is_ok()
    }

    /// Number of live subscribers (0 if the hub has stopped).
    pub async fn subscriber_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(HubCommand::SubscriberCount { respond_to: tx })
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
