//! MAVLink Protocol Handlers
//!
//! Inbound message handlers. Each handler validates one packet, performs the
//! side effect through the vehicle collaborators and records its replies in
//! a [`HandlerContext`]; the channel writes those replies (space permitting)
//! once the handler returns.
//!
//! # Handlers
//!
//! - **Command Handler**: COMMAND_LONG, table-driven per vehicle profile
//! - **Mission Handler**: mission upload/download, home-only upload
//! - **Parameter Handler**: PARAM_REQUEST_LIST, PARAM_REQUEST_READ, PARAM_SET
//! - **Fence Handler**: FENCE_POINT / RALLY_POINT read and write
//! - **Input Handler**: heartbeat, RC override, stream control, logs, pass-through

pub mod command;
pub mod fence;
pub mod inputs;
pub mod mission;
pub mod param;

use heapless::Vec;
use mavlink::ardupilotmega::{MavMessage, MavSeverity};
use pico_trail_gcs_core::{MessageId, Peer};

use super::channel::ChannelEvent;
use super::config::GcsConfig;
use super::status_notifier::StatusNotifier;
use super::vehicle::{Vehicle, VehicleProfile};

pub use command::CommandEntry;

/// Frames written straight back on the receiving channel
pub type Replies = Vec<MavMessage, 4>;

/// Cross-channel effects of one handled message
pub type Events = Vec<ChannelEvent, 4>;

/// Everything a handler may touch while processing one inbound message
pub struct HandlerContext<'a> {
    pub vehicle: &'a mut dyn Vehicle,
    pub profile: &'static VehicleProfile,
    pub config: &'a GcsConfig,
    pub notifier: &'a mut StatusNotifier,
    /// Sender of the message being handled
    pub source: Peer,
    replies: Replies,
    queued: Vec<MessageId, 2>,
    events: Events,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        vehicle: &'a mut dyn Vehicle,
        profile: &'static VehicleProfile,
        config: &'a GcsConfig,
        notifier: &'a mut StatusNotifier,
        source: Peer,
    ) -> Self {
        Self {
            vehicle,
            profile,
            config,
            notifier,
            source,
            replies: Vec::new(),
            queued: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Queue a frame for immediate transmission on this channel
    pub fn reply(&mut self, message: MavMessage) {
        if self.replies.push(message).is_err() {
            crate::log_warn!("Reply buffer full, frame dropped");
        }
    }

    /// Ask the dispatcher to send `id` (deferred if it does not fit)
    pub fn send_message(&mut self, id: MessageId) {
        if !self.queued.contains(&id) {
            let _ = self.queued.push(id);
        }
    }

    /// Raise an effect the frontend applies to every channel
    pub fn raise(&mut self, event: ChannelEvent) {
        if self.events.push(event).is_err() {
            crate::log_warn!("Channel event buffer full, event dropped");
        }
    }

    pub fn send_text(&mut self, severity: MavSeverity, text: &str) {
        self.notifier.send(severity, text);
    }

    /// Replies, dispatcher requests and events, in that order
    pub fn finish(self) -> (Replies, Vec<MessageId, 2>, Events) {
        (self.replies, self.queued, self.events)
    }
}

/// Decode a NUL-padded MAVLink name field
pub(crate) fn name_from_bytes(bytes: &[u8]) -> Option<&str> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).ok()
}

/// Encode a name into a NUL-padded MAVLink field, truncating at 16 bytes
pub(crate) fn name_to_bytes(name: &str) -> [u8; 16] {
    let mut out = [0u8; 16];
    let len = name.len().min(16);
    out[..len].copy_from_slice(&name.as_bytes()[..len]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        let bytes = name_to_bytes("SR0_EXTRA1");
        assert_eq!(name_from_bytes(&bytes), Some("SR0_EXTRA1"));

        let full = name_to_bytes("ABCDEFGHIJKLMNOPQRS");
        assert_eq!(name_from_bytes(&full), Some("ABCDEFGHIJKLMNOP"));
    }

    #[test]
    fn test_invalid_utf8_name() {
        assert_eq!(name_from_bytes(&[0xff, 0xfe, 0]), None);
    }
}
