//! parkwatch TUI - terminal views over parking occupancy
//!
//! Three views share the same widgets:
//!
//! 1. **Local view** (`local`): a render thread polling a [`StateStore`]
//!    in-process, showing the annotated frame next to the zone board
//! 2. **Board** (`client` + `app`): a networked subscriber that keeps a
//!    connection to the daemon and shows the pushed zone states
//! 3. **Mark tool** (`mark`): click zone corners on a frame and print the
//!    resulting zone file
//!
//! All loops respect a shared `CancellationToken` for graceful shutdown.
//!
//! [`StateStore`]: parkwatch_core::StateStore

pub mod app;
pub mod client;
pub mod error;
pub mod input;
pub mod local;
pub mod mark;
pub mod terminal;
pub mod ui;

// Re-export commonly used types
pub use app::{App, ConnectionState};
pub use client::{BoardClient, BoardClientConfig};
pub use error::{Result, TuiError};
pub use local::LocalView;
pub use mark::{MarkSession, POINTS_PER_ZONE};
