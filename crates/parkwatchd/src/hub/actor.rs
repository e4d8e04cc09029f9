//! Hub actor - owns the subscriber table and fans out updates.
//!
//! # Panic-Free Guarantees
//!
//! Send failures to a subscriber remove that subscriber; they never stop
//! the actor or affect other subscribers.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info};

use parkwatch_core::{OccupancyMap, StateStore};
use parkwatch_protocol::DaemonMessage;

use super::commands::{HubCommand, HubError};

/// One network subscriber.
struct Subscriber {
    outbox: mpsc::Sender<DaemonMessage>,
    /// Store version of the last map queued for this subscriber
    last_version: u64,
}

/// The hub actor - owns all subscriber state.
///
/// Runs in a single task and processes commands sequentially; the version
/// comparison in [`HubActor::handle_broadcast`] relies on that.
pub struct HubActor {
    receiver: mpsc::UnboundedReceiver<HubCommand>,
    store: StateStore,
    subscribers: HashMap<String, Subscriber>,
}

impl HubActor {
    pub fn new(receiver: mpsc::UnboundedReceiver<HubCommand>, store: StateStore) -> Self {
        Self {
            receiver,
            store,
            subscribers: HashMap::new(),
        }
    }

    /// Runs until every handle has been dropped.
    pub async fn run(mut self) {
        info!("Broadcast hub starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(subscribers = self.subscribers.len(), "Broadcast hub stopped");
    }

    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Subscribe {
                client_id,
                outbox,
                respond_to,
            } => {
                let result = self.handle_subscribe(client_id, outbox);
                // Ignore send error - the connection may already be gone
                let _ = respond_to.send(result);
            }
            HubCommand::Unsubscribe { client_id } => {
                if self.subscribers.remove(&client_id).is_some() {
                    debug!(client_id = %client_id, "Removed subscriber");
                }
            }
            HubCommand::Broadcast { occupancy, version } => {
                self.handle_broadcast(occupancy, version);
            }
            HubCommand::SubscriberCount { respond_to } => {
                let _ = respond_to.send(self.subscribers.len());
            }
        }
    }

    fn handle_subscribe(
        &mut self,
        client_id: String,
        outbox: mpsc::Sender<DaemonMessage>,
    ) -> Result<(), HubError> {
        if self.subscribers.contains_key(&client_id) {
            return Err(HubError::AlreadySubscribed(client_id));
        }

        let (occupancy, version) = self.store.occupancy();
        if outbox
            .try_send(DaemonMessage::parking_update(occupancy))
            .is_err()
        {
            return Err(HubError::OutboxClosed);
        }

        debug!(client_id = %client_id, version, "Added subscriber");
        self.subscribers.insert(
            client_id,
            Subscriber {
                outbox,
                last_version: version,
            },
        );
        Ok(())
    }

    /// Sends `occupancy` to every subscriber that has not yet seen
    /// `version`, dropping any whose outbox is full or closed.
    fn handle_broadcast(&mut self, occupancy: OccupancyMap, version: u64) {
        let message = DaemonMessage::parking_update(occupancy);
        let mut failed = Vec::new();
        let mut delivered = 0usize;

        for (client_id, sub) in self.subscribers.iter_mut() {
            if sub.last_version >= version {
                continue;
            }
            match sub.outbox.try_send(message.clone()) {
                Ok(()) => {
                    sub.last_version = version;
                    delivered += 1;
                }
                Err(e) => {
                    debug!(client_id = %client_id, error = %e, "Failed to queue update");
                    failed.push(client_id.clone());
                }
            }
        }

        for client_id in failed {
            self.subscribers.remove(&client_id);
            debug!(client_id = %client_id, "Removed failed subscriber");
        }

        debug!(version, delivered, "Broadcast occupancy update");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_core::{Frame, Point, RenderedFrame, ZoneId, ZoneRegistry, ZoneState};
    use std::sync::Arc;

    fn store() -> StateStore {
        let zones = ZoneRegistry::from_polygons(vec![vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
        ]])
        .unwrap();
        StateStore::new(&zones)
    }

    fn map(state: ZoneState) -> OccupancyMap {
        OccupancyMap::from_entries(vec![(ZoneId::numbered(1), state)])
    }

    fn frame() -> Arc<RenderedFrame> {
        Arc::new(RenderedFrame {
            index: 0,
            image: Frame::filled(1, 1, [0, 0, 0]).unwrap(),
            detections: 0,
            captured_at: chrono::Utc::now(),
        })
    }

    fn actor(store: StateStore) -> HubActor {
        let (_tx, rx) = mpsc::unbounded_channel();
        HubActor::new(rx, store)
    }

    fn drain(rx: &mut mpsc::Receiver<DaemonMessage>) -> Vec<DaemonMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_subscribe_receives_current_map() {
        let store = store();
        let mut hub = actor(store.clone());
        let (tx, mut rx) = mpsc::channel(4);

        hub.handle_subscribe("a".into(), tx).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![DaemonMessage::parking_update(map(ZoneState::Free))]
        );
    }

    #[test]
    fn test_duplicate_subscribe_rejected() {
        let mut hub = actor(store());
        let (tx, _rx) = mpsc::channel(4);
        hub.handle_subscribe("a".into(), tx.clone()).unwrap();
        assert_eq!(
            hub.handle_subscribe("a".into(), tx),
            Err(HubError::AlreadySubscribed("a".into()))
        );
    }

    #[test]
    fn test_broadcast_skips_already_seen_version() {
        let store = store();
        let mut hub = actor(store.clone());

        // Store moves to v1 before the subscriber arrives; the broadcast for
        // v1 is still in flight when the subscription is processed.
        let v1 = store.replace(map(ZoneState::Occupied), frame());
        let (tx, mut rx) = mpsc::channel(4);
        hub.handle_subscribe("late".into(), tx).unwrap();
        hub.handle_broadcast(map(ZoneState::Occupied), v1);

        let received = drain(&mut rx);
        assert_eq!(received.len(), 1, "no duplicate of v1");
    }

    #[test]
    fn test_broadcast_delivers_newer_version() {
        let store = store();
        let mut hub = actor(store.clone());
        let (tx, mut rx) = mpsc::channel(4);
        hub.handle_subscribe("a".into(), tx).unwrap();

        let v1 = store.replace(map(ZoneState::Occupied), frame());
        hub.handle_broadcast(map(ZoneState::Occupied), v1);

        let received = drain(&mut rx);
        assert_eq!(received.len(), 2);
        assert_eq!(
            received.last(),
            Some(&DaemonMessage::parking_update(map(ZoneState::Occupied)))
        );
    }

    #[test]
    fn test_failed_subscriber_removed_others_unaffected() {
        let mut hub = actor(store());
        let (good_tx, mut good_rx) = mpsc::channel(4);
        let (bad_tx, bad_rx) = mpsc::channel(4);
        hub.handle_subscribe("good".into(), good_tx).unwrap();
        hub.handle_subscribe("bad".into(), bad_tx).unwrap();
        drop(bad_rx);

        hub.handle_broadcast(map(ZoneState::Occupied), 1);

        assert_eq!(hub.subscribers.len(), 1);
        assert!(hub.subscribers.contains_key("good"));
        assert_eq!(drain(&mut good_rx).len(), 2);
    }

    #[test]
    fn test_full_outbox_drops_subscriber() {
        let mut hub = actor(store());
        let (tx, _rx) = mpsc::channel(1);
        // Initial update fills the only slot
        hub.handle_subscribe("slow".into(), tx).unwrap();
        hub.handle_broadcast(map(ZoneState::Occupied), 1);
        assert!(hub.subscribers.is_empty());
    }

    #[test]
    fn test_subscribe_with_closed_outbox_fails() {
        let mut hub = actor(store());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert_eq!(
            hub.handle_subscribe("gone".into(), tx),
            Err(HubError::OutboxClosed)
        );
        assert!(hub.subscribers.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_hub_counts_subscribers() {
        let handle = super::super::spawn_hub(store());
        let (tx, _rx) = mpsc::channel(4);
        handle.subscribe("a".into(), tx).await.unwrap();
        assert_eq!(handle.subscriber_count().await, 1);
        handle.unsubscribe("a");
        assert_eq!(handle.subscriber_count().await, 0);
    }
}
