//! GCS Channel Configuration
//!
//! Injected into every channel at registration. Stream rates are kept
//! separately in each channel's `StreamRates` table.

use pico_trail_gcs_core::trigger::{TriggerPolicy, DEFAULT_BASE_RATE_HZ, DEFAULT_SESSION_THROTTLE};

/// Main-loop time a non-essential send needs left, in microseconds
pub const DEFAULT_MIN_TIME_BUDGET_US: u32 = 1200;

/// Parameters sent per PARAMS trigger without flow control
pub const DEFAULT_PARAMS_PER_BURST: u8 = 5;

/// Silence after which the next mission item is requested again
pub const DEFAULT_MISSION_REREQUEST_MS: u32 = 1000;

/// Silence after which a mission upload is abandoned
pub const DEFAULT_MISSION_TIMEOUT_MS: u32 = 8000;

/// Per-channel GCS configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcsConfig {
    /// Our MAVLink system id
    pub system_id: u8,
    /// Our MAVLink component id
    pub component_id: u8,
    /// System id of the controlling GCS (`SYSID_MYGCS`); only its
    /// heartbeats and RC overrides feed the failsafe
    pub gcs_system_id: u8,
    /// Scheduler tick rate in Hz
    pub base_rate_hz: u8,
    /// Stream rate multiplier while a protocol session is open
    pub session_throttle_factor: f32,
    /// Minimum main-loop time left before a telemetry send is attempted
    pub min_time_budget_us: u32,
    /// Seconds after boot during which telemetry is held back (`TELEM_DELAY`)
    pub telemetry_delay_s: u8,
    /// Parameter values per PARAMS trigger on links without flow control
    pub params_per_burst: u8,
    pub mission_rerequest_ms: u32,
    pub mission_timeout_ms: u32,
    /// Announced in a status text when a parameter download starts
    pub firmware_string: &'static str,
    /// AUTOPILOT_VERSION flight_sw_version
    pub flight_sw_version: u32,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            system_id: 1,
            component_id: 1,
            gcs_system_id: 255,
            base_rate_hz: DEFAULT_BASE_RATE_HZ,
            session_throttle_factor: DEFAULT_SESSION_THROTTLE,
            min_time_budget_us: DEFAULT_MIN_TIME_BUDGET_US,
            telemetry_delay_s: 0,
            params_per_burst: DEFAULT_PARAMS_PER_BURST,
            mission_rerequest_ms: DEFAULT_MISSION_REREQUEST_MS,
            mission_timeout_ms: DEFAULT_MISSION_TIMEOUT_MS,
            firmware_string: "pico_trail_gcs v0.1.0",
            flight_sw_version: 0x0001_0000,
        }
    }
}

impl GcsConfig {
    /// Trigger engine tunables derived from this configuration
    pub fn trigger_policy(&self) -> TriggerPolicy {
        TriggerPolicy {
            base_rate_hz: self.base_rate_hz,
            session_throttle_factor: self.session_throttle_factor,
        }
    }

    /// Whether telemetry is still held back at `now_ms` after boot
    pub fn telemetry_delayed(&self, now_ms: u32) -> bool {
        self.telemetry_delay_s != 0 && (now_ms >> 10) <= self.telemetry_delay_s as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GcsConfig::default();
        assert_eq!(config.base_rate_hz, 50);
        assert_eq!(config.session_throttle_factor, 0.25);
        assert_eq!(config.min_time_budget_us, 1200);
        assert_eq!(config.trigger_policy(), TriggerPolicy::default());
    }

    #[test]
    fn test_telemetry_delay() {
        let mut config = GcsConfig::default();
        assert!(!config.telemetry_delayed(0));

        config.telemetry_delay_s = 3;
        assert!(config.telemetry_delayed(0));
        assert!(config.telemetry_delayed(3 * 1024 + 1023));
        assert!(!config.telemetry_delayed(4 * 1024));
    }
}
