//! Stream Trigger Engine
//!
//! Tick-based decimator turning a configured rate in Hz into "fire now"
//! decisions at the fixed scheduler tick rate. One engine per channel; one
//! countdown per stream.
//!
//! On fire, the countdown is reloaded with
//! `floor(base / min(rate, base)) - 1 + slowdown`, so a stream at `R` Hz
//! fires every `floor(base / R) + slowdown` ticks.

use crate::stream::{StreamId, NUM_STREAMS};

/// Scheduler tick rate in Hz
pub const DEFAULT_BASE_RATE_HZ: u8 = 50;

/// Rate multiplier applied to telemetry streams while a mission upload or
/// parameter download is in progress.
pub const DEFAULT_SESSION_THROTTLE: f32 = 0.25;

/// Tunables shared by every stream of a channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerPolicy {
    /// Fixed scheduler tick frequency
    pub base_rate_hz: u8,
    /// De-prioritization factor while a protocol session is open
    pub session_throttle_factor: f32,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            base_rate_hz: DEFAULT_BASE_RATE_HZ,
            session_throttle_factor: DEFAULT_SESSION_THROTTLE,
        }
    }
}

/// Per-channel stream countdowns
#[derive(Debug, Clone, PartialEq)]
pub struct StreamTrigger {
    policy: TriggerPolicy,
    ticks: [u16; NUM_STREAMS],
    slowdown: u16,
}

impl StreamTrigger {
    pub fn new(policy: TriggerPolicy) -> Self {
        Self {
            policy,
            ticks: [0; NUM_STREAMS],
            slowdown: 0,
        }
    }

    pub fn policy(&self) -> &TriggerPolicy {
        &self.policy
    }

    /// Extra ticks added to every reloaded period
    pub fn slowdown(&self) -> u16 {
        self.slowdown
    }

    pub fn set_slowdown(&mut self, slowdown: u16) {
        self.slowdown = slowdown;
    }

    /// Remaining countdown of a stream
    pub fn ticks_remaining(&self, stream: StreamId) -> u16 {
        self.ticks[stream.index()]
    }

    /// Zero every countdown so each enabled stream fires on its next check
    pub fn reset(&mut self) {
        self.ticks = [0; NUM_STREAMS];
    }

    /// Decide whether `stream` fires on this tick.
    ///
    /// `configured_hz` is the live table value; `session_active` is true while
    /// a mission upload or parameter download is open on the channel.
    pub fn trigger(&mut self, stream: StreamId, configured_hz: f32, session_active: bool) -> bool {
        self.trigger_index(stream.index(), configured_hz, session_active)
    }

    /// Raw-slot variant of [`trigger`](Self::trigger). Out-of-range slots
    /// never fire.
    pub fn trigger_index(&mut self, index: usize, configured_hz: f32, session_active: bool) -> bool {
        let Some(stream) = StreamId::from_index(index) else {
            return false;
        };

        // Fractional rates truncate to whole Hz
        let mut rate = (configured_hz as u8) as f32;

        if session_active && stream != StreamId::Params {
            rate *= self.policy.session_throttle_factor;
        }

        if rate <= 0.0 {
            return false;
        }

        let counter = &mut self.ticks[index];
        if *counter == 0 {
            let base = self.policy.base_rate_hz as f32;
            if rate > base {
                rate = base;
            }
            let period = (base / rate) as u32;
            let reload = period.saturating_sub(1) + self.slowdown as u32;
            *counter = reload.min(u16::MAX as u32) as u16;
            return true;
        }

        *counter -= 1;
        false
    }
}

impl Default for StreamTrigger {
    fn default() -> Self {
        Self::new(TriggerPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_fires(trigger: &mut StreamTrigger, stream: StreamId, hz: f32, ticks: usize) -> usize {
        (0..ticks)
            .filter(|_| trigger.trigger(stream, hz, false))
            .count()
    }

    #[test]
    fn test_fires_immediately_then_waits_period() {
        let mut trigger = StreamTrigger::default();
        assert!(trigger.trigger(StreamId::Position, 10.0, false));
        assert_eq!(trigger.ticks_remaining(StreamId::Position), 4);
        for _ in 0..4 {
            assert!(!trigger.trigger(StreamId::Position, 10.0, false));
        }
        assert!(trigger.trigger(StreamId::Position, 10.0, false));
    }

    #[test]
    fn test_ten_and_one_hz_over_one_second() {
        let mut trigger = StreamTrigger::default();
        let mut raw = 0;
        let mut extra1 = 0;
        for _ in 0..50 {
            if trigger.trigger(StreamId::RawSensors, 10.0, false) {
                raw += 1;
            }
            if trigger.trigger(StreamId::Extra1, 1.0, false) {
                extra1 += 1;
            }
        }
        assert_eq!(raw, 10);
        assert_eq!(extra1, 1);
    }

    #[test]
    fn test_zero_and_negative_never_fire() {
        let mut trigger = StreamTrigger::default();
        assert_eq!(count_fires(&mut trigger, StreamId::Extra3, 0.0, 500), 0);
        assert_eq!(count_fires(&mut trigger, StreamId::Extra3, -5.0, 500), 0);
        // Sub-1 Hz truncates to zero
        assert_eq!(count_fires(&mut trigger, StreamId::Extra3, 0.9, 500), 0);
    }

    #[test]
    fn test_fractional_rate_truncates() {
        let mut a = StreamTrigger::default();
        let mut b = StreamTrigger::default();
        assert_eq!(
            count_fires(&mut a, StreamId::Extra2, 2.9, 200),
            count_fires(&mut b, StreamId::Extra2, 2.0, 200)
        );
    }

    #[test]
    fn test_rate_above_base_clamps() {
        let mut trigger = StreamTrigger::default();
        assert_eq!(count_fires(&mut trigger, StreamId::RawSensors, 200.0, 50), 50);
    }

    #[test]
    fn test_out_of_range_index() {
        let mut trigger = StreamTrigger::default();
        assert!(!trigger.trigger_index(NUM_STREAMS, 10.0, false));
        assert!(!trigger.trigger_index(usize::MAX, 10.0, false));
    }

    #[test]
    fn test_session_throttles_telemetry_but_not_params() {
        let mut trigger = StreamTrigger::default();
        let mut position = 0;
        let mut params = 0;
        for _ in 0..100 {
            if trigger.trigger(StreamId::Position, 10.0, true) {
                position += 1;
            }
            if trigger.trigger(StreamId::Params, 10.0, true) {
                params += 1;
            }
        }
        // 10 Hz * 0.25 = 2.5 Hz -> period 20 ticks
        assert_eq!(position, 5);
        assert_eq!(params, 20);
    }

    #[test]
    fn test_session_throttle_factor_is_configurable() {
        let mut trigger = StreamTrigger::new(TriggerPolicy {
            base_rate_hz: 50,
            session_throttle_factor: 0.5,
        });
        assert!(trigger.trigger(StreamId::Extra1, 10.0, true));
        assert_eq!(trigger.ticks_remaining(StreamId::Extra1), 9);
    }

    #[test]
    fn test_slowdown_extends_every_period() {
        let mut trigger = StreamTrigger::default();
        trigger.set_slowdown(5);
        assert!(trigger.trigger(StreamId::RcChannels, 10.0, false));
        assert_eq!(trigger.ticks_remaining(StreamId::RcChannels), 9);
        assert_eq!(count_fires(&mut trigger, StreamId::RcChannels, 10.0, 100), 10);
    }

    #[test]
    fn test_streams_are_independent() {
        let mut trigger = StreamTrigger::default();
        assert!(trigger.trigger(StreamId::Extra1, 1.0, false));
        assert!(trigger.trigger(StreamId::Extra2, 1.0, false));
        assert_eq!(trigger.ticks_remaining(StreamId::Extra1), 49);
        assert_eq!(trigger.ticks_remaining(StreamId::Extra3), 0);

        trigger.reset();
        assert_eq!(trigger.ticks_remaining(StreamId::Extra1), 0);
    }
}
