//! Hub actor commands and errors.

use parkwatch_core::OccupancyMap;
use parkwatch_protocol::DaemonMessage;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Commands sent to the hub actor.
#[derive(Debug)]
pub enum HubCommand {
    /// Register a subscriber and push the current map to it.
    Subscribe {
        client_id: String,
        outbox: mpsc::Sender<DaemonMessage>,
        respond_to: oneshot::Sender<Result<(), HubError>>,
    },

    /// Forget a subscriber. Unknown ids are ignored.
    Unsubscribe { client_id: String },

    /// Deliver a changed map to every subscriber that has not seen `version`.
    Broadcast {
        occupancy: OccupancyMap,
        version: u64,
    },

    /// Number of live subscribers.
    SubscriberCount { respond_to: oneshot::Sender<usize> },
}

/// Errors that can occur during hub operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("Client already subscribed: {0}")]
    AlreadySubscribed(String),

    #[error("Subscriber outbox closed before the initial update")]
    OutboxClosed,

    #[error("Hub channel closed")]
    ChannelClosed,
}
