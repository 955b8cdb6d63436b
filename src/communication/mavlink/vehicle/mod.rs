//! Vehicle Collaborators and Capability Profiles
//!
//! The GCS layer never owns vehicle state. Everything it reads or mutates is
//! reached through the traits below, implemented by the firmware (and by
//! [`MockVehicle`](crate::communication::mavlink::mock::MockVehicle) in
//! tests). Getters have no side effects; mutators report whether the state
//! actually changed so acknowledgements never claim more than happened.
//!
//! What differs between vehicle types (stream membership, message gates,
//! command table, mission protocol variant, accepted inbound messages) is
//! data in a [`VehicleProfile`], not code. See [`plane`] and [`tracker`].

pub mod plane;
pub mod tracker;

use core::fmt;

use bitflags::bitflags;
use heapless::{String, Vec};
use mavlink::ardupilotmega::{
    MavCmd, MavMessage, MavParamType, MavResult, COMMAND_LONG_DATA, GLOBAL_POSITION_INT_DATA,
    MANUAL_CONTROL_DATA, RADIO_STATUS_DATA, RallyFlags, SCALED_PRESSURE_DATA,
};
use pico_trail_gcs_core::command::{CalibrationPolicy, ModeRequest, ParachuteAction};
use pico_trail_gcs_core::{Location, MessageId, StreamId};

use super::handlers::command::CommandEntry;

pub use plane::PLANE;
pub use tracker::TRACKER;

/// Wire frames produced by one send action
pub type TelemetryFrames = Vec<MavMessage, 2>;

/// Read-only vehicle state the scheduler and handlers consult
pub trait VehicleState {
    /// Milliseconds since boot
    fn now_ms(&self) -> u32;

    /// Microseconds left before the main loop needs the CPU again
    fn time_available_us(&self) -> u32 {
        u32::MAX
    }

    /// Blocked in a long-running initialisation call (sensor calibration,
    /// flash erase); only parameter traffic may flow
    fn in_mavlink_delay(&self) -> bool {
        false
    }

    fn is_armed(&self) -> bool;

    fn in_manual_mode(&self) -> bool {
        false
    }

    fn home(&self) -> Option<Location>;

    fn current_location(&self) -> Option<Location> {
        None
    }
}

/// Field values for telemetry messages
pub trait TelemetrySource {
    /// Push the wire messages for `id` onto `frames`, in the order of
    /// `id.spec().frames`. Pushing nothing is allowed (sensor absent).
    fn build_telemetry(&self, id: MessageId, frames: &mut TelemetryFrames);
}

/// Mode, arming, home and actuator mutators
pub trait VehicleControl {
    fn arm(&mut self) -> bool;
    fn disarm(&mut self) -> bool;

    fn set_mode(&mut self, mode: ModeRequest) -> bool;
    /// SET_MODE with a vehicle-specific custom mode number
    fn set_custom_mode(&mut self, custom_mode: u32) -> bool;

    fn set_home(&mut self, home: Location) -> bool;
    fn set_home_to_current(&mut self) -> bool {
        false
    }

    fn set_servo(&mut self, channel: u8, pwm: u16) -> bool {
        let _ = (channel, pwm);
        false
    }
    fn repeat_servo(&mut self, channel: u8, pwm: u16, repeat: u16, cycle_ms: u32) -> bool {
        let _ = (channel, pwm, repeat, cycle_ms);
        false
    }
    fn set_relay(&mut self, relay: u8, on: bool) -> bool {
        let _ = (relay, on);
        false
    }
    fn repeat_relay(&mut self, relay: u8, repeat: u16, cycle_ms: u32) -> bool {
        let _ = (relay, repeat, cycle_ms);
        false
    }

    /// Request a reboot; `hold_in_bootloader` keeps the board in its loader
    fn reboot(&mut self, hold_in_bootloader: bool);

    fn jump_to_landing_sequence(&mut self) -> bool {
        false
    }
    /// Abort a landing; `climb_alt_cm` overrides the go-around altitude
    fn go_around(&mut self, climb_alt_cm: Option<i32>) -> bool {
        let _ = climb_alt_cm;
        false
    }
    fn set_autotune(&mut self, enable: bool) {
        let _ = enable;
    }
    /// Parachute control; the error text is announced to the GCS
    fn parachute(&mut self, action: ParachuteAction) -> Result<(), &'static str> {
        let _ = action;
        Err("Parachute not fitted")
    }
    fn vtol_transition(&mut self, state: u8) -> MavResult {
        let _ = state;
        MavResult::MAV_RESULT_UNSUPPORTED
    }
    fn rc_bind(&mut self, kind: u8) -> bool {
        let _ = kind;
        false
    }
    /// Point the mount at `roi`; `None` releases GPS-point tracking
    fn set_roi(&mut self, roi: Option<Location>) {
        let _ = roi;
    }
    fn camera_configure(&mut self, cmd: &COMMAND_LONG_DATA) {
        let _ = cmd;
    }
    /// Returns true when a picture was taken
    fn camera_control(&mut self, cmd: &COMMAND_LONG_DATA) -> bool {
        let _ = cmd;
        false
    }
    fn mount_control(&mut self, pitch: f32, roll: f32, yaw: f32, mode: u8) {
        let _ = (pitch, roll, yaw, mode);
    }

    /// Guided-mode target from a MISSION_ITEM with `current == 2`
    fn guided_request(&mut self, item: &MissionItem) -> bool {
        let _ = item;
        false
    }
    /// Altitude change from a MISSION_ITEM with `current == 3`
    fn change_alt_request(&mut self, item: &MissionItem) -> bool {
        let _ = item;
        false
    }

    /// The controlling GCS is alive (failsafe input)
    fn gcs_heartbeat(&mut self, now_ms: u32);

    /// Returns true when the overrides were applied
    fn set_rc_overrides(&mut self, channels: &[u16; 8]) -> bool {
        let _ = channels;
        false
    }
}

/// Sensor calibration routines used by PREFLIGHT_CALIBRATION and friends
pub trait SensorCalibration {
    fn calibrate_gyros(&mut self) -> bool;
    fn calibrate_baro(&mut self) -> bool;
    fn trim_radio(&mut self) -> bool {
        false
    }
    /// Start the interactive accelerometer calibration
    fn calibrate_accel(&mut self) -> bool {
        false
    }
    fn calibrate_accel_trim(&mut self) -> bool {
        false
    }
    fn set_compass_offsets(&mut self, compass: u8, offsets: [f32; 3]) -> bool {
        let _ = (compass, offsets);
        false
    }
    fn mag_cal_command(&mut self, command: u16, cmd: &COMMAND_LONG_DATA) -> MavResult {
        let _ = (command, cmd);
        MavResult::MAV_RESULT_UNSUPPORTED
    }
    /// Bracket around calibration so the vehicle can pause failsafes
    fn set_in_calibration(&mut self, active: bool) {
        let _ = active;
    }
}

/// One stored mission command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionItem {
    pub seq: u16,
    pub command: MavCmd,
    pub location: Location,
    pub params: [f32; 4],
    pub autocontinue: bool,
}

/// Mission storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MissionStoreError {
    /// No room for another command
    Full,
    /// Index beyond the stored mission
    InvalidIndex,
    /// Backing storage write failed
    Storage,
}

impl fmt::Display for MissionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionStoreError::Full => write!(f, "Mission storage full"),
            MissionStoreError::InvalidIndex => write!(f, "Invalid mission index"),
            MissionStoreError::Storage => write!(f, "Mission storage write failed"),
        }
    }
}

/// Mission storage subsystem
pub trait MissionStore {
    fn mission_count(&self) -> u16;
    fn mission_capacity(&self) -> u16;
    fn mission_item(&self, seq: u16) -> Option<MissionItem>;
    fn replace_mission_item(&mut self, item: &MissionItem) -> Result<(), MissionStoreError>;
    fn append_mission_item(&mut self, item: &MissionItem) -> Result<(), MissionStoreError>;
    /// Drop every command from `count` onwards
    fn truncate_mission(&mut self, count: u16);
    fn clear_mission(&mut self) -> bool;
    fn current_mission_item(&self) -> u16 {
        0
    }
    fn set_current_mission_item(&mut self, seq: u16) -> bool;
    /// Called once when an upload finishes
    fn mission_upload_complete(&mut self) {}
}

/// Geofence point storage and enable switches
pub trait GeofenceStore {
    fn fence_present(&self) -> bool {
        false
    }
    /// Points may only be written while the fence action is NONE
    fn fence_action_is_none(&self) -> bool {
        true
    }
    fn fence_total(&self) -> u8 {
        0
    }
    /// (lat, lng) in 1e-7 degrees
    fn fence_point(&self, index: u8) -> Option<(i32, i32)> {
        let _ = index;
        None
    }
    fn set_fence_point(&mut self, index: u8, lat: i32, lng: i32) -> bool {
        let _ = (index, lat, lng);
        false
    }
    fn set_fence_enabled(&mut self, enabled: bool) -> bool {
        let _ = enabled;
        false
    }
    fn set_fence_floor_enabled(&mut self, enabled: bool) -> bool {
        let _ = enabled;
        false
    }
}

/// One stored rally point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RallyPoint {
    pub lat: i32,
    pub lng: i32,
    pub alt: i16,
    pub break_alt: i16,
    pub land_dir: u16,
    pub flags: RallyFlags,
}

/// Rally point storage
pub trait RallyStore {
    fn rally_total(&self) -> u8 {
        0
    }
    fn rally_max(&self) -> u8 {
        0
    }
    fn rally_point(&self, index: u8) -> Option<RallyPoint> {
        let _ = index;
        None
    }
    fn set_rally_point(&mut self, index: u8, point: RallyPoint) -> bool {
        let _ = (index, point);
        false
    }
}

/// Maximum MAVLink parameter name length
pub const PARAM_NAME_LEN: usize = 16;

/// One parameter as reported over PARAM_VALUE
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub name: String<PARAM_NAME_LEN>,
    pub value: f32,
    pub param_type: MavParamType,
}

/// Parameter store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamError {
    NotFound,
    ReadOnly,
    OutOfRange,
    Storage,
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::NotFound => write!(f, "Parameter not found"),
            ParamError::ReadOnly => write!(f, "Parameter is read-only"),
            ParamError::OutOfRange => write!(f, "Parameter value out of range"),
            ParamError::Storage => write!(f, "Parameter storage error"),
        }
    }
}

/// Persistent parameter storage
pub trait ParameterStore {
    fn param_count(&self) -> u16;
    fn param(&self, index: u16) -> Option<ParamEntry>;
    /// Index of the parameter called `name`
    fn find_param(&self, name: &str) -> Option<u16>;
    /// Set a parameter and return its index
    fn set_param(&mut self, name: &str, value: f32) -> Result<u16, ParamError>;
}

/// Inbound messages forwarded to subsystems outside the GCS layer
pub trait AuxiliaryInputs {
    /// LOG_REQUEST_LIST / LOG_REQUEST_DATA / LOG_ERASE / LOG_REQUEST_END
    fn handle_log_request(&mut self, message: &MavMessage, download_active: bool) {
        let _ = (message, download_active);
    }
    /// Next log-download frame, if one is ready
    fn log_send(&mut self, frames: &mut TelemetryFrames, download_active: bool) {
        let _ = (frames, download_active);
    }
    fn serial_control(&mut self, message: &MavMessage) {
        let _ = message;
    }
    fn inject_gps(&mut self, message: &MavMessage) {
        let _ = message;
    }
    fn radio_status(&mut self, status: &RADIO_STATUS_DATA) {
        let _ = status;
    }
    fn manual_control(&mut self, input: &MANUAL_CONTROL_DATA) {
        let _ = input;
    }
    /// Position of the tracked vehicle (antenna tracker)
    fn tracking_position(&mut self, position: &GLOBAL_POSITION_INT_DATA) {
        let _ = position;
    }
    /// Barometer of the tracked vehicle (antenna tracker)
    fn tracking_pressure(&mut self, pressure: &SCALED_PRESSURE_DATA) {
        let _ = pressure;
    }
}

/// Everything the GCS layer needs from a vehicle
pub trait Vehicle:
    VehicleState
    + TelemetrySource
    + VehicleControl
    + SensorCalibration
    + MissionStore
    + GeofenceStore
    + RallyStore
    + ParameterStore
    + AuxiliaryInputs
{
}

impl<T> Vehicle for T where
    T: VehicleState
        + TelemetrySource
        + VehicleControl
        + SensorCalibration
        + MissionStore
        + GeofenceStore
        + RallyStore
        + ParameterStore
        + AuxiliaryInputs
{
}

/// Messages dispatched when a stream fires, in order
#[derive(Debug, Clone, Copy)]
pub struct StreamSpec {
    pub stream: StreamId,
    pub messages: &'static [MessageId],
}

/// How a profile yields to the flight loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backpressure {
    /// Hold telemetry back for `telemetry_delay_s` after boot
    pub honour_telemetry_delay: bool,
    /// Skip sends (and flag out-of-time) when the main loop is short of time
    pub enforce_time_budget: bool,
}

/// Mission upload variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionProtocol {
    /// Only item 0 (home) can be written
    HomeOnly,
    /// Full upload/download/clear/set-current protocol
    Full,
}

bitflags! {
    /// Optional inbound messages a profile accepts
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InboundFeatures: u16 {
        const GEOFENCE = 1 << 0;
        const RALLY = 1 << 1;
        /// GLOBAL_POSITION_INT / SCALED_PRESSURE of a tracked vehicle
        const TRACKING_INPUTS = 1 << 2;
        const RC_OVERRIDE = 1 << 3;
        const SET_HOME_POSITION = 1 << 4;
        /// HEARTBEAT from the controlling GCS refreshes the failsafe
        const GCS_FAILSAFE = 1 << 5;
    }
}

/// Per-vehicle capability table
pub struct VehicleProfile {
    pub name: &'static str,
    /// Streams in priority order; PARAMS is serviced separately
    pub streams: &'static [StreamSpec],
    /// Ids this vehicle recognises but never sends
    pub placeholders: &'static [MessageId],
    /// Per-message gate consulted before each dispatch
    pub message_gate: fn(MessageId, &dyn Vehicle) -> bool,
    pub commands: &'static [CommandEntry],
    /// Modes reachable through DO_SET_MODE
    pub modes: &'static [ModeRequest],
    pub backpressure: Backpressure,
    pub mission: MissionProtocol,
    pub features: InboundFeatures,
    /// Only COMMAND_LONG targeted at this component may arm (None: any)
    pub arm_component: Option<u8>,
    pub calibration: CalibrationPolicy,
    pub calibration_requires_disarmed: bool,
}

impl VehicleProfile {
    /// Member messages of `stream`, empty if the profile never sends it
    pub fn stream_messages(&self, stream: StreamId) -> &'static [MessageId] {
        self.streams
            .iter()
            .find(|spec| spec.stream == stream)
            .map(|spec| spec.messages)
            .unwrap_or(&[])
    }

    pub fn is_placeholder(&self, id: MessageId) -> bool {
        id.spec().is_placeholder() || self.placeholders.contains(&id)
    }

    pub fn command(&self, command: u16) -> Option<&'static CommandEntry> {
        self.commands.iter().find(|entry| entry.command == command)
    }
}

impl fmt::Debug for VehicleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VehicleProfile")
            .field("name", &self.name)
            .field("mission", &self.mission)
            .field("features", &self.features)
            .finish()
    }
}

/// Gate that lets every message through
pub fn allow_all(_id: MessageId, _vehicle: &dyn Vehicle) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pico_trail_gcs_core::command::MAV_CMD_COMPONENT_ARM_DISARM;

    #[test]
    fn test_stream_lookup() {
        assert_eq!(
            PLANE.stream_messages(StreamId::RawSensors),
            &[MessageId::RawImu1, MessageId::RawImu2, MessageId::RawImu3]
        );
        assert!(TRACKER.stream_messages(StreamId::Extra2).is_empty());
        assert!(PLANE.stream_messages(StreamId::Params).is_empty());
    }

    #[test]
    fn test_placeholders() {
        assert!(PLANE.is_placeholder(MessageId::RetryDeferred));
        assert!(PLANE.is_placeholder(MessageId::LimitsStatus));
        assert!(!PLANE.is_placeholder(MessageId::VfrHud));
        assert!(TRACKER.is_placeholder(MessageId::VfrHud));
    }

    #[test]
    fn test_command_lookup() {
        assert!(PLANE.command(MAV_CMD_COMPONENT_ARM_DISARM).is_some());
        assert!(TRACKER.command(MAV_CMD_COMPONENT_ARM_DISARM).is_some());
        assert!(PLANE.command(9999).is_none());
    }
}
