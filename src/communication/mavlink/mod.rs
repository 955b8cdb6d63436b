//! MAVLink GCS Layer
//!
//! Message dispatch and telemetry streaming between the vehicle and up to
//! [`frontend::MAX_CHANNELS`] ground control stations.
//!
//! # Architecture
//!
//! - **Frontend**: Owns every channel, fans vehicle-wide events out to them
//! - **Channel**: Per-link state, inbound routing, outbound dispatch and the
//!   data-stream scheduler
//! - **Handlers**: Inbound message and command handlers
//! - **Vehicle**: Collaborator traits and the plane/tracker profiles
//! - **Writer**: Space-checked frame writer over a [`transport::LinkPort`]
//!
//! # Usage
//!
//! ```ignore
//! use pico_trail_gcs::communication::mavlink::{GcsConfig, GcsFrontend, PLANE};
//!
//! let mut frontend = GcsFrontend::new(&PLANE, GcsConfig::default());
//! let index = frontend.add_channel(uart_link)?;
//! frontend.handle_message(index, &header, &msg, &mut vehicle)?;
//! frontend.tick(&mut vehicle);
//! ```

pub mod channel; // Per-link GCS channel
pub mod config; // Channel configuration
pub mod frontend; // Multi-channel fan-out
pub mod handlers; // Inbound message handlers
pub mod mock; // Test doubles
pub mod status_notifier; // STATUSTEXT queue
#[cfg(feature = "embassy")]
pub mod task; // Embassy ticker task
pub mod transport; // Link port abstraction
pub mod vehicle; // Vehicle collaborators and profiles
pub mod writer; // Space-checked frame writer

pub use channel::{ChannelError, ChannelEvent, GcsChannel};
pub use config::GcsConfig;
pub use frontend::{GcsFrontend, MAX_CHANNELS};
pub use transport::{LinkError, LinkPort};
pub use vehicle::{Vehicle, VehicleProfile, PLANE, TRACKER};
