//! STATUSTEXT Queue
//!
//! Each channel owns a [`StatusNotifier`]: a fixed-capacity queue of
//! STATUSTEXT chunks waiting for the dispatcher's STATUSTEXT slot. Texts
//! longer than one 50-byte chunk are split using the MAVLink v2 `id` /
//! `chunk_seq` extension.
//!
//! # Usage
//!
//! ```ignore
//! channel.notifier_mut().send_warning("Bad fence point");
//! channel.send_message(MessageId::StatusText, vehicle);
//! ```

use core::fmt::{self, Write};

use heapless::{Deque, String, Vec};
use mavlink::ardupilotmega::{MavSeverity, STATUSTEXT_DATA};

/// Maximum text length; longer texts are truncated
pub const MAX_MESSAGE_LEN: usize = 200;

/// Queued chunks per channel
const QUEUE_CAPACITY: usize = 16;

/// Chunk size for MAVLink STATUSTEXT messages (50 bytes)
const CHUNK_SIZE: usize = 50;

/// Maximum number of chunks per message (200 / 50 = 4)
const MAX_CHUNKS: usize = 4;

/// Owned text line used for formatted announcements
pub type TextLine = String<MAX_MESSAGE_LEN>;

/// Format into a [`TextLine`], truncating at [`MAX_MESSAGE_LEN`]
pub fn format_line(args: fmt::Arguments<'_>) -> TextLine {
    let mut line = TruncatingLine(TextLine::new());
    let _ = line.write_fmt(args);
    line.0
}

struct TruncatingLine(TextLine);

impl Write for TruncatingLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Per-channel STATUSTEXT queue
#[derive(Debug)]
pub struct StatusNotifier {
    queue: Deque<STATUSTEXT_DATA, QUEUE_CAPACITY>,
    next_chunk_id: u16,
    dropped_count: u32,
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusNotifier {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            next_chunk_id: 1, // 0 marks a non-chunked text
            dropped_count: 0,
        }
    }

    /// Queue a text. When full, the oldest chunks are dropped.
    pub fn send(&mut self, severity: MavSeverity, text: &str) {
        let chunk_id = self.allocate_chunk_id(text);
        for chunk in chunk_message(severity, text, chunk_id) {
            if self.queue.is_full() {
                self.queue.pop_front();
                self.dropped_count += 1;
                crate::log_warn!(
                    "STATUSTEXT queue full, dropped {} chunks",
                    self.dropped_count
                );
            }
            let _ = self.queue.push_back(chunk);
        }
    }

    pub fn send_info(&mut self, text: &str) {
        self.send(MavSeverity::MAV_SEVERITY_INFO, text);
    }

    pub fn send_notice(&mut self, text: &str) {
        self.send(MavSeverity::MAV_SEVERITY_NOTICE, text);
    }

    pub fn send_warning(&mut self, text: &str) {
        self.send(MavSeverity::MAV_SEVERITY_WARNING, text);
    }

    /// Next chunk ready to go out
    pub fn peek(&self) -> Option<&STATUSTEXT_DATA> {
        self.queue.front()
    }

    pub fn pop(&mut self) -> Option<STATUSTEXT_DATA> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn dropped_count(&self) -> u32 {
        self.dropped_count
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    fn allocate_chunk_id(&mut self, text: &str) -> u16 {
        if text.len() <= CHUNK_SIZE {
            return 0;
        }
        let id = self.next_chunk_id;
        self.next_chunk_id = match self.next_chunk_id.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        id
    }
}

/// Split a text into STATUSTEXT chunks.
///
/// Texts of at most 50 bytes produce one chunk with `id = 0`. Longer texts
/// are split into up to four chunks sharing `chunk_id` with increasing
/// `chunk_seq`.
pub(crate) fn chunk_message(
    severity: MavSeverity,
    text: &str,
    chunk_id: u16,
) -> Vec<STATUSTEXT_DATA, MAX_CHUNKS> {
    let bytes = text.as_bytes();
    let len = bytes.len().min(MAX_MESSAGE_LEN);
    let mut chunks = Vec::new();

    if len <= CHUNK_SIZE {
        let mut text_bytes = [0u8; CHUNK_SIZE];
        text_bytes[..len].copy_from_slice(&bytes[..len]);
        chunks
            .push(STATUSTEXT_DATA {
                severity,
                text: text_bytes.into(),
                id: 0,
                chunk_seq: 0,
            })
            .ok();
        return chunks;
    }

    let mut offset = 0;
    let mut chunk_seq = 0;
    while offset < len && chunk_seq < MAX_CHUNKS {
        let chunk_len = (len - offset).min(CHUNK_SIZE);
        let mut text_bytes = [0u8; CHUNK_SIZE];
        text_bytes[..chunk_len].copy_from_slice(&bytes[offset..offset + chunk_len]);

        chunks
            .push(STATUSTEXT_DATA {
                severity,
                text: text_bytes.into(),
                id: chunk_id,
                chunk_seq: chunk_seq as u8,
            })
            .ok();

        offset += chunk_len;
        chunk_seq += 1;
    }

    chunks
}
