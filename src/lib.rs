#![cfg_attr(not(test), no_std)]

//! pico_trail_gcs - GCS message dispatch and telemetry streaming
//!
//! This library routes MAVLink traffic between an autopilot and its ground
//! control stations: command and mission handling on the way in, rate
//! limited telemetry streams on the way out.

#[cfg(all(feature = "mock", not(test)))]
extern crate std;

// Logging macros
pub mod core;

// GCS channels, handlers and the telemetry scheduler
pub mod communication;
