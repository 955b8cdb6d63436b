//! Frame Writer
//!
//! Owns a channel's [`LinkPort`] and enforces the check-space-then-write
//! discipline: a frame is handed to the port only when the port reports room
//! for the frame's worst-case encoded size, so frames are either written
//! whole or not at all.
//!
//! Also stamps the MAVLink header (system/component id, rolling sequence)
//! and keeps per-link statistics.

use mavlink::ardupilotmega::MavMessage;
use mavlink::{MavHeader, Message};
use pico_trail_gcs_core::message::frame_len;

use super::transport::{LinkError, LinkPort};

/// Writer statistics for monitoring and diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Frames handed to the link
    pub messages_sent: u32,
    /// Frames skipped because the link had no room
    pub buffer_overflows: u32,
    /// Link write errors
    pub write_errors: u32,
}

/// Header stamping and space-checked writes for one link
pub struct FrameWriter<L: LinkPort> {
    link: L,
    system_id: u8,
    component_id: u8,
    sequence: u8,
    stats: WriterStats,
}

impl<L: LinkPort> FrameWriter<L> {
    pub fn new(link: L, system_id: u8, component_id: u8) -> Self {
        Self {
            link,
            system_id,
            component_id,
            sequence: 0,
            stats: WriterStats::default(),
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Get writer statistics
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Reset writer statistics
    pub fn reset_stats(&mut self) {
        self.stats = WriterStats::default();
    }

    /// Sequence number the next frame will carry
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Free transmit bytes on the link
    pub fn tx_space(&self) -> usize {
        self.link.tx_space()
    }

    /// Whether `bytes` fit in the link's transmit buffer right now
    pub fn has_space(&self, bytes: usize) -> bool {
        self.link.tx_space() >= bytes
    }

    /// Write one frame if it fits.
    ///
    /// # Errors
    ///
    /// - `LinkError::BufferFull` - not enough space; nothing was written
    /// - any error reported by the port
    pub fn write(&mut self, message: &MavMessage) -> Result<(), LinkError> {
        let needed = frame_len(message.message_id());
        if !self.has_space(needed) {
            self.stats.buffer_overflows += 1;
            return Err(LinkError::BufferFull);
        }

        let header = MavHeader {
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: self.sequence,
        };

        match self.link.write_frame(header, message) {
            Ok(()) => {
                self.sequence = self.sequence.wrapping_add(1);
                self.stats.messages_sent += 1;
                Ok(())
            }
            Err(e) => {
                self.stats.write_errors += 1;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mavlink::mock::MockLink;
    use mavlink::ardupilotmega::{MavModeFlag, MavState, HEARTBEAT_DATA};

    fn heartbeat() -> MavMessage {
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 0,
            mavtype: mavlink::ardupilotmega::MavType::MAV_TYPE_FIXED_WING,
            autopilot: mavlink::ardupilotmega::MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
            base_mode: MavModeFlag::empty(),
            system_status: MavState::MAV_STATE_STANDBY,
            mavlink_version: 3,
        })
    }

    #[test]
    fn test_write_stamps_sequence() {
        let mut writer = FrameWriter::new(MockLink::new(1024), 1, 1);
        writer.write(&heartbeat()).unwrap();
        writer.write(&heartbeat()).unwrap();

        let link = writer.link();
        assert_eq!(link.frames().len(), 2);
        assert_eq!(link.headers()[0].sequence, 0);
        assert_eq!(link.headers()[1].sequence, 1);
        assert_eq!(link.headers()[1].system_id, 1);
        assert_eq!(writer.stats().messages_sent, 2);
    }

    #[test]
    fn test_write_without_space_is_noop() {
        // Heartbeat frame is 9 + 12 bytes
        let mut writer = FrameWriter::new(MockLink::new(20), 1, 1);
        assert_eq!(writer.write(&heartbeat()), Err(LinkError::BufferFull));
        assert_eq!(writer.link().used(), 0);
        assert!(writer.link().frames().is_empty());
        assert_eq!(writer.stats().buffer_overflows, 1);
        assert_eq!(writer.sequence(), 0);
    }

    #[test]
    fn test_exact_fit() {
        let mut writer = FrameWriter::new(MockLink::new(21), 1, 1);
        assert!(writer.write(&heartbeat()).is_ok());
        assert_eq!(writer.tx_space(), 0);
    }

    #[test]
    fn test_port_error_counted() {
        let mut link = MockLink::new(1024);
        link.fail_writes(true);
        let mut writer = FrameWriter::new(link, 1, 1);
        assert_eq!(writer.write(&heartbeat()), Err(LinkError::Io));
        assert_eq!(writer.stats().write_errors, 1);
    }
}
