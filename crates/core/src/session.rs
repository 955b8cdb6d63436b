//! Mission Upload Session
//!
//! Per-channel state machine for receiving a mission from a GCS:
//!
//! ```text
//! Idle ──(COUNT / WRITE_PARTIAL_LIST)──▶ Receiving ──(last item / reject / timeout)──▶ Idle
//! ```
//!
//! A new start request always supersedes a session in progress.

use core::fmt;

/// Identity of the GCS driving a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Peer {
    pub system_id: u8,
    pub component_id: u8,
}

impl Peer {
    pub const fn new(system_id: u8, component_id: u8) -> Self {
        Self {
            system_id,
            component_id,
        }
    }
}

/// Upload state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Receiving {
        /// Sequence number expected next
        next_seq: u16,
        /// Last sequence number of the upload (inclusive)
        last_seq: u16,
        peer: Peer,
        last_receive_ms: u32,
        last_request_ms: u32,
    },
}

/// Why an item was refused by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    /// No upload in progress
    NotReceiving,
    /// Item is not the one requested
    OutOfSequence { expected: u16, received: u16 },
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::NotReceiving => write!(f, "No mission upload in progress"),
            UploadError::OutOfSequence { expected, received } => {
                write!(f, "Expected mission item {}, received {}", expected, received)
            }
        }
    }
}

/// Result of accepting one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadProgress {
    /// More items expected; request `next_seq`
    More { next_seq: u16 },
    /// Last item stored; the session is closed
    Complete { peer: Peer },
}

/// Housekeeping outcome of [`UploadSession::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPoll {
    Idle,
    Waiting,
    /// The GCS has been quiet; ask for the expected item again
    ReRequest,
    /// The session was dropped for inactivity
    TimedOut { peer: Peer },
}

/// Mission upload session of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadSession {
    state: UploadState,
}

impl UploadSession {
    pub const fn new() -> Self {
        Self {
            state: UploadState::Idle,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn is_receiving(&self) -> bool {
        matches!(self.state, UploadState::Receiving { .. })
    }

    /// Open a session for items `first..=last` from `peer`
    pub fn begin(&mut self, first: u16, last: u16, peer: Peer, now_ms: u32) {
        self.state = UploadState::Receiving {
            next_seq: first,
            last_seq: last,
            peer,
            last_receive_ms: now_ms,
            last_request_ms: now_ms,
        };
    }

    /// Check that `seq` is the item the session is waiting for
    pub fn expect(&self, seq: u16) -> Result<Peer, UploadError> {
        match self.state {
            UploadState::Idle => Err(UploadError::NotReceiving),
            UploadState::Receiving { next_seq, peer, .. } => {
                if seq == next_seq {
                    Ok(peer)
                } else {
                    Err(UploadError::OutOfSequence {
                        expected: next_seq,
                        received: seq,
                    })
                }
            }
        }
    }

    /// Record the expected item as stored and move on
    pub fn advance(&mut self, now_ms: u32) -> Result<UploadProgress, UploadError> {
        let UploadState::Receiving {
            next_seq,
            last_seq,
            peer,
            ..
        } = self.state
        else {
            return Err(UploadError::NotReceiving);
        };

        if next_seq >= last_seq {
            self.state = UploadState::Idle;
            return Ok(UploadProgress::Complete { peer });
        }

        let next_seq = next_seq + 1;
        self.state = UploadState::Receiving {
            next_seq,
            last_seq,
            peer,
            last_receive_ms: now_ms,
            last_request_ms: now_ms,
        };
        Ok(UploadProgress::More { next_seq })
    }

    /// Close the session without completing it
    pub fn abort(&mut self) -> Option<Peer> {
        match core::mem::take(&mut self.state) {
            UploadState::Idle => None,
            UploadState::Receiving { peer, .. } => Some(peer),
        }
    }

    /// Item to request next, if any
    pub fn pending_request(&self) -> Option<(u16, Peer)> {
        match self.state {
            UploadState::Receiving {
                next_seq,
                last_seq,
                peer,
                ..
            } if next_seq <= last_seq => Some((next_seq, peer)),
            _ => None,
        }
    }

    /// Re-request and timeout housekeeping, called once per update.
    pub fn poll(&mut self, now_ms: u32, rerequest_ms: u32, timeout_ms: u32) -> SessionPoll {
        let UploadState::Receiving {
            peer,
            last_receive_ms,
            ref mut last_request_ms,
            ..
        } = self.state
        else {
            return SessionPoll::Idle;
        };

        if now_ms.wrapping_sub(last_receive_ms) > timeout_ms {
            self.state = UploadState::Idle;
            return SessionPoll::TimedOut { peer };
        }

        if now_ms.wrapping_sub(*last_request_ms) > rerequest_ms {
            *last_request_ms = now_ms;
            return SessionPoll::ReRequest;
        }

        SessionPoll::Waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GCS: Peer = Peer::new(255, 190);

    #[test]
    fn test_idle_rejects_items() {
        let session = UploadSession::new();
        assert_eq!(session.expect(0), Err(UploadError::NotReceiving));
        assert_eq!(session.pending_request(), None);
    }

    #[test]
    fn test_full_upload() {
        let mut session = UploadSession::new();
        session.begin(0, 2, GCS, 0);
        assert_eq!(session.pending_request(), Some((0, GCS)));

        assert_eq!(session.expect(0), Ok(GCS));
        assert_eq!(session.advance(10), Ok(UploadProgress::More { next_seq: 1 }));
        assert_eq!(session.advance(20), Ok(UploadProgress::More { next_seq: 2 }));
        assert_eq!(session.advance(30), Ok(UploadProgress::Complete { peer: GCS }));
        assert!(!session.is_receiving());
    }

    #[test]
    fn test_single_item_session() {
        let mut session = UploadSession::new();
        session.begin(0, 0, GCS, 0);
        assert_eq!(session.advance(5), Ok(UploadProgress::Complete { peer: GCS }));
    }

    #[test]
    fn test_out_of_sequence() {
        let mut session = UploadSession::new();
        session.begin(3, 5, GCS, 0);
        assert_eq!(
            session.expect(4),
            Err(UploadError::OutOfSequence {
                expected: 3,
                received: 4
            })
        );
        assert_eq!(session.abort(), Some(GCS));
        assert_eq!(session.abort(), None);
    }

    #[test]
    fn test_new_start_supersedes() {
        let mut session = UploadSession::new();
        session.begin(0, 9, GCS, 0);
        session.advance(1).unwrap();
        let other = Peer::new(1, 1);
        session.begin(0, 1, other, 2);
        assert_eq!(session.pending_request(), Some((0, other)));
    }

    #[test]
    fn test_poll_rerequest_then_timeout() {
        let mut session = UploadSession::new();
        assert_eq!(session.poll(0, 1000, 8000), SessionPoll::Idle);

        session.begin(0, 3, GCS, 0);
        assert_eq!(session.poll(500, 1000, 8000), SessionPoll::Waiting);
        assert_eq!(session.poll(1001, 1000, 8000), SessionPoll::ReRequest);
        assert_eq!(session.poll(1500, 1000, 8000), SessionPoll::Waiting);
        assert_eq!(session.poll(8001, 1000, 8000), SessionPoll::TimedOut { peer: GCS });
        assert!(!session.is_receiving());
    }

    #[test]
    fn test_progress_resets_timeout() {
        let mut session = UploadSession::new();
        session.begin(0, 3, GCS, 0);
        session.advance(7000).unwrap();
        assert_eq!(session.poll(8500, 1000, 8000), SessionPoll::ReRequest);
    }
}
