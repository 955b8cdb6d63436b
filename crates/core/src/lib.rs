//! pico_trail_gcs_core - Pure no_std GCS link logic
//!
//! Protocol-independent building blocks of the ground-control-station link:
//! how often each telemetry stream fires, what every logical message costs
//! on the wire, how mission coordinates map onto locations, and the mission
//! upload session. Nothing here touches MAVLink types or a transport.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies
//! - **Owned state**: every table and counter belongs to one channel
//!
//! # Modules
//!
//! - [`stream`]: Stream ids and the per-channel rate table
//! - [`trigger`]: Tick-based stream trigger engine
//! - [`message`]: Logical message ids and worst-case wire sizes
//! - [`location`]: Locations, home validation and mission frames
//! - [`session`]: Mission upload session state machine
//! - [`command`]: Command ids, mode decoding and calibration plans

#![no_std]

pub mod command;
pub mod location;
pub mod message;
pub mod session;
pub mod stream;
pub mod trigger;

pub use location::{HomeError, Location, LocationFlags, MissionFrame};
pub use message::{MessageId, MessageSpec};
pub use session::{Peer, SessionPoll, UploadError, UploadProgress, UploadSession};
pub use stream::{RateParamError, StreamId, StreamRates, NUM_STREAMS};
pub use trigger::{StreamTrigger, TriggerPolicy};
