//! # cowatch client
//!
//! Per-viewer synchronization logic:
//! - [`synchronizer`]: turns local player events into hub submissions and
//!   applies peer snapshots without echoing them back
//! - [`session`]: the flags and resume state machine owned by one synchronizer
//! - [`player`]: the capability interface to the video widget
//! - [`link`]: WebSocket and HTTP transports to the relay hub
//! - [`store`]: offline copy of the last emitted snapshot
//! - [`sim`]: a clock-driven player for headless use and tests

pub mod bootstrap;
pub mod error;
pub mod link;
pub mod player;
pub mod session;
pub mod sim;
pub mod store;
pub mod synchronizer;
pub mod timing;

pub use error::{Error, Result};
pub use player::{Player, PlayerError, PlayerEvent, PlayerEvents, PlayerFactory, PlayerRequest};
pub use synchronizer::{Command, Notice, SyncHandle, SyncInput, Synchronizer};
pub use timing::SyncTimings;
