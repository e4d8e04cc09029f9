//! parkwatch daemon - frame pipeline and occupancy push server
//!
//! This crate provides the daemon infrastructure:
//! - `config` - daemon configuration (TOML file, environment, CLI overrides)
//! - `source` - frame sources with the end-of-stream restart policy
//! - `detect` - detection oracle backends
//! - `publisher` - change-gated occupancy publishing
//! - `hub` - broadcast hub actor fanning updates out to subscribers
//! - `server` - TCP push server for networked subscribers
//! - `producer` - the dedicated frame-processing thread
//! - `shutdown` - bounded waits on OS threads during shutdown
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────── producer thread ────────────────────┐
//! │ FrameSource ─▶ Detector ─▶ assign ─▶ annotate ─▶ ChangePublisher
//! └──────────────────────────────────────────────┬──────────┘
//!                                                │ replace / refresh_frame
//!                                                ▼
//!                                         ┌─────────────┐
//!                           local view ◀──│ StateStore  │
//!                                         └──────┬──────┘
//!                                                │ HubHandle::send_update
//!                                                ▼ (unbounded mpsc)
//!                     ┌─────────────────┐   ┌─────────────┐
//!                     │  DaemonServer   │──▶│  HubActor   │──▶ subscriber outboxes
//!                     │ (TCP listener)  │   └─────────────┘
//!                     └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod detect;
pub mod hub;
pub mod producer;
pub mod publisher;
pub mod server;
pub mod shutdown;
pub mod source;
