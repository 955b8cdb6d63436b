//! GCS Link Port Abstraction
//!
//! The byte transport (UART, UDP, radio) sits behind [`LinkPort`]. Framing,
//! CRC and signing belong to the port; the GCS layer hands it whole
//! `MavMessage` values and only ever asks two questions: how many bytes of
//! transmit buffer are free, and please queue this frame.
//!
//! # Design Pattern
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │   GcsChannel (scheduler/handlers)    │
//! └──────────┬───────────────────────────┘
//!            │ FrameWriter: check space, then write
//!            ▼
//! ┌──────────────────────────────────────┐
//! │           impl LinkPort              │
//! │  (serial driver, UDP socket, mock)   │
//! └──────────────────────────────────────┘
//! ```
//!
//! Every call is non-blocking. A port that cannot take a frame right now
//! reports a small `tx_space()`; the writer then skips the frame instead of
//! waiting.

use core::fmt;

use mavlink::ardupilotmega::MavMessage;
use mavlink::MavHeader;

/// Non-blocking transmit side of one GCS link
pub trait LinkPort {
    /// Bytes that can be queued right now without blocking or truncation
    fn tx_space(&self) -> usize;

    /// Queue one complete frame.
    ///
    /// Callers guarantee `tx_space()` covered the frame's worst-case size
    /// beforehand; a port must either queue the whole frame or nothing.
    fn write_frame(&mut self, header: MavHeader, message: &MavMessage) -> Result<(), LinkError>;

    /// Whether the link has hardware flow control (allows larger
    /// parameter bursts)
    fn has_flow_control(&self) -> bool {
        false
    }
}

/// Link port errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Transmit buffer cannot hold the frame
    BufferFull,
    /// Transport-level I/O error
    Io,
    /// Link is down
    Disconnected,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::BufferFull => write!(f, "Link transmit buffer full"),
            LinkError::Io => write!(f, "Link I/O error"),
            LinkError::Disconnected => write!(f, "Link disconnected"),
        }
    }
}
