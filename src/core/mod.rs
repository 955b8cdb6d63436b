//! Core infrastructure
//!
//! Logging macros shared by the GCS layer.

pub mod logging;
