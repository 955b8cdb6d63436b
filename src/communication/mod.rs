//! Communication Protocols
//!
//! MAVLink ground control station link: inbound command and mission
//! handling, outbound telemetry streaming.

pub mod mavlink;
