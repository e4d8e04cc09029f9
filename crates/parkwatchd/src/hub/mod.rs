//! Broadcast hub using Actor pattern.
//!
//! The hub is the only place that knows which network subscribers exist.
//! It receives commands over an unbounded mpsc channel, so the producer
//! thread can publish without an async context and without ever blocking.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  Broadcast   ┌─────────────────┐  try_send   ┌──────────────┐
//! │ ChangePublisher │─────────────▶│    HubActor     │────────────▶│  outbox (n)  │
//! │ (producer thr.) │              │                 │             │ writer task  │
//! └─────────────────┘              │ subscribers +   │             └──────────────┘
//!                      Subscribe   │ last_version    │
//! ┌─────────────────┐─────────────▶│                 │
//! │ConnectionHandler│ Unsubscribe  └────────┬────────┘
//! └─────────────────┘                       │ occupancy()
//!                                           ▼
//!                                    ┌─────────────┐
//!                                    │ StateStore  │
//!                                    └─────────────┘
//! ```
//!
//! # Ordering
//!
//! Commands are handled one at a time. A new subscriber is sent the
//! store's current map and remembers that map's version. A broadcast is
//! delivered only to subscribers whose remembered version is older, so
//! every subscriber sees distinct states in production order with no
//! duplicates, whichever of "subscribe" and "broadcast" reaches the hub
//! first.
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::mpsc;

use parkwatch_core::StateStore;

mod actor;
mod commands;
mod handle;

pub use actor::HubActor;
pub use commands::{HubCommand, HubError};
pub use handle::HubHandle;

/// Per-subscriber outbox capacity. A subscriber that falls this far behind
/// is dropped rather than allowed to stall everyone else.
pub const OUTBOX_CAPACITY: usize = 64;

/// Spawn the hub actor and return a handle for interaction.
///
/// Must be called from within a tokio runtime.
///
/// # Example
///
/// ```no_run
/// use parkwatch_core::{StateStore, ZoneRegistry};
/// use parkwatchd::hub::spawn_hub;
///
/// #[tokio::main]
/// async fn main() {
///     let store = StateStore::new(&ZoneRegistry::default());
///     let hub = spawn_hub(store);
///     assert_eq!(hub.subscriber_count().await, 0);
/// }
/// ```
pub fn spawn_hub(store: StateStore) -> HubHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let actor = HubActor::new(cmd_rx, store);
    tokio::spawn(actor.run());
    HubHandle::new(cmd_tx)
}
