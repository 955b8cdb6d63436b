//! Mock link and vehicle for testing
//!
//! [`MockLink`] records every frame the GCS layer writes and reports a
//! configurable transmit buffer. [`MockVehicle`] implements every vehicle
//! collaborator with plain public fields, so tests can set up state directly
//! and assert on what the handlers changed.
//!
//! # Feature Gate
//!
//! Available during test builds and with the `mock` feature enabled.
//!
//! # Example
//!
//! ```ignore
//! use pico_trail_gcs::communication::mavlink::mock::{MockLink, MockVehicle};
//!
//! let link = MockLink::new(1024);
//! let mut vehicle = MockVehicle::new();
//! vehicle.now = 5_000;
//! ```

#![cfg(any(test, feature = "mock"))]

use core::cell::Cell;
use std::vec::Vec;

use heapless::String;
use mavlink::ardupilotmega::{
    MavCmd, MavMessage, MavParamType, GLOBAL_POSITION_INT_DATA, MANUAL_CONTROL_DATA,
    RADIO_STATUS_DATA, SCALED_PRESSURE_DATA,
};
use mavlink::{MavHeader, Message};
use pico_trail_gcs_core::command::ModeRequest;
use pico_trail_gcs_core::message::frame_len;
use pico_trail_gcs_core::{Location, MessageId};

use super::transport::{LinkError, LinkPort};
use super::vehicle::{
    AuxiliaryInputs, GeofenceStore, MissionItem, MissionStore, MissionStoreError, ParamEntry,
    ParamError, ParameterStore, RallyPoint, RallyStore, SensorCalibration, TelemetryFrames,
    TelemetrySource, VehicleControl, VehicleState,
};

/// In-memory link port
///
/// Space is consumed by the worst-case size of every written frame and only
/// comes back through [`drain`](Self::drain), like a UART FIFO between two
/// scheduler ticks.
#[derive(Debug)]
pub struct MockLink {
    capacity: usize,
    used: usize,
    frames: Vec<MavMessage>,
    headers: Vec<MavHeader>,
    fail_writes: bool,
    flow_control: bool,
}

impl MockLink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: 0,
            frames: Vec::new(),
            headers: Vec::new(),
            fail_writes: false,
            flow_control: false,
        }
    }

    /// Frames written so far
    pub fn frames(&self) -> &[MavMessage] {
        &self.frames
    }

    pub fn headers(&self) -> &[MavHeader] {
        &self.headers
    }

    /// Bytes consumed since the last drain
    pub fn used(&self) -> usize {
        self.used
    }

    /// Make every write fail with `LinkError::Io`
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn set_flow_control(&mut self, enabled: bool) {
        self.flow_control = enabled;
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Free all buffer space, keeping the recorded frames
    pub fn drain(&mut self) {
        self.used = 0;
    }

    /// Forget recorded frames and free all buffer space
    pub fn clear(&mut self) {
        self.used = 0;
        self.frames.clear();
        self.headers.clear();
    }

    /// Number of recorded frames with MAVLink message id `msg_id`
    pub fn count(&self, msg_id: u32) -> usize {
        self.frames
            .iter()
            .filter(|frame| frame.message_id() == msg_id)
            .count()
    }
}

impl LinkPort for MockLink {
    fn tx_space(&self) -> usize {
        self.capacity.saturating_sub(self.used)
    }

    fn write_frame(&mut self, header: MavHeader, message: &MavMessage) -> Result<(), LinkError> {
        if self.fail_writes {
            return Err(LinkError::Io);
        }
        let len = frame_len(message.message_id());
        if len > self.tx_space() {
            return Err(LinkError::BufferFull);
        }
        self.used += len;
        self.headers.push(header);
        self.frames.push(message.clone());
        Ok(())
    }

    fn has_flow_control(&self) -> bool {
        self.flow_control
    }
}

/// Vehicle double with every collaborator backed by public fields
#[derive(Debug)]
pub struct MockVehicle {
    pub now: u32,
    pub time_available_us: u32,
    /// Report no spare time once this many telemetry builds happened
    pub exhaust_after_builds: Option<u32>,
    builds: Cell<u32>,
    pub in_delay: bool,
    /// Ids whose sensor is absent (build pushes nothing)
    pub absent: Vec<MessageId>,

    pub armed: bool,
    pub arm_allowed: bool,
    pub manual_mode: bool,
    pub mode: Option<ModeRequest>,
    pub custom_mode: Option<u32>,
    pub home: Option<Location>,
    pub current_location: Option<Location>,
    pub reboot_requested: Option<bool>,
    pub servos: Vec<(u8, u16)>,
    pub rc_overrides: Option<[u16; 8]>,
    pub guided_ok: bool,
    pub last_gcs_heartbeat_ms: Option<u32>,

    pub gyro_cal_ok: bool,
    pub baro_cal_ok: bool,
    pub in_calibration: bool,
    /// Calibration routines started
    pub calibrations: u32,

    pub mission: Vec<MissionItem>,
    pub mission_capacity: u16,
    pub current_item: u16,
    pub upload_completions: u32,

    pub fence_total: u8,
    pub fence_points: [(i32, i32); 16],
    pub fence_enabled: bool,
    pub fence_action_none: bool,

    pub rally_total: u8,
    pub rally_max: u8,
    pub rally_points: [Option<RallyPoint>; 10],

    pub params: Vec<ParamEntry>,

    pub log_requests: u32,
    /// Frames handed out by `log_send`, one per call
    pub log_frames: u32,
    pub radio_reports: u32,
    pub manual_inputs: u32,
    pub tracking_updates: u32,
    pub forwarded: u32,
}

impl Default for MockVehicle {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVehicle {
    pub fn new() -> Self {
        Self {
            now: 0,
            time_available_us: u32::MAX,
            exhaust_after_builds: None,
            builds: Cell::new(0),
            in_delay: false,
            absent: Vec::new(),
            armed: false,
            arm_allowed: true,
            manual_mode: false,
            mode: None,
            custom_mode: None,
            home: None,
            current_location: None,
            reboot_requested: None,
            servos: Vec::new(),
            rc_overrides: None,
            guided_ok: true,
            last_gcs_heartbeat_ms: None,
            gyro_cal_ok: true,
            baro_cal_ok: true,
            in_calibration: false,
            calibrations: 0,
            mission: Vec::new(),
            mission_capacity: 32,
            current_item: 0,
            upload_completions: 0,
            fence_total: 0,
            fence_points: [(0, 0); 16],
            fence_enabled: false,
            fence_action_none: true,
            rally_total: 0,
            rally_max: 10,
            rally_points: [None; 10],
            params: Vec::new(),
            log_requests: 0,
            log_frames: 0,
            radio_reports: 0,
            manual_inputs: 0,
            tracking_updates: 0,
            forwarded: 0,
        }
    }

    /// Vehicle with REAL32 parameters `(name, value)`, indexed in order
    pub fn with_params(params: &[(&str, f32)]) -> Self {
        let mut vehicle = Self::new();
        for &(name, value) in params {
            let mut id = String::new();
            let _ = id.push_str(name);
            vehicle.params.push(ParamEntry {
                name: id,
                value,
                param_type: MavParamType::MAV_PARAM_TYPE_REAL32,
            });
        }
        vehicle
    }

    /// Append a NAV_WAYPOINT at `location`
    pub fn push_waypoint(&mut self, location: Location) {
        let seq = self.mission.len() as u16;
        self.mission.push(MissionItem {
            seq,
            command: MavCmd::MAV_CMD_NAV_WAYPOINT,
            location,
            params: [0.0; 4],
            autocontinue: true,
        });
    }

    /// Telemetry builds performed so far
    pub fn builds(&self) -> u32 {
        self.builds.get()
    }
}

impl VehicleState for MockVehicle {
    fn now_ms(&self) -> u32 {
        self.now
    }

    fn time_available_us(&self) -> u32 {
        match self.exhaust_after_builds {
            Some(limit) if self.builds.get() >= limit => 0,
            _ => self.time_available_us,
        }
    }

    fn in_mavlink_delay(&self) -> bool {
        self.in_delay
    }

    fn is_armed(&self) -> bool {
        self.armed
    }

    fn in_manual_mode(&self) -> bool {
        self.manual_mode
    }

    fn home(&self) -> Option<Location> {
        self.home
    }

    fn current_location(&self) -> Option<Location> {
        self.current_location
    }
}

impl TelemetrySource for MockVehicle {
    fn build_telemetry(&self, id: MessageId, frames: &mut TelemetryFrames) {
        self.builds.set(self.builds.get() + 1);
        if self.absent.contains(&id) {
            return;
        }
        for &msg_id in id.spec().frames {
            if let Ok(message) = MavMessage::default_message_from_id(msg_id) {
                let _ = frames.push(message);
            }
        }
    }
}

impl VehicleControl for MockVehicle {
    fn arm(&mut self) -> bool {
        if !self.arm_allowed {
            return false;
        }
        self.armed = true;
        true
    }

    fn disarm(&mut self) -> bool {
        self.armed = false;
        true
    }

    fn set_mode(&mut self, mode: ModeRequest) -> bool {
        self.mode = Some(mode);
        true
    }

    fn set_custom_mode(&mut self, custom_mode: u32) -> bool {
        self.custom_mode = Some(custom_mode);
        true
    }

    fn set_home(&mut self, home: Location) -> bool {
        self.home = Some(home);
        true
    }

    fn set_home_to_current(&mut self) -> bool {
        match self.current_location {
            Some(location) => {
                self.home = Some(location);
                true
            }
            None => false,
        }
    }

    fn set_servo(&mut self, channel: u8, pwm: u16) -> bool {
        self.servos.push((channel, pwm));
        true
    }

    fn reboot(&mut self, hold_in_bootloader: bool) {
        self.reboot_requested = Some(hold_in_bootloader);
    }

    fn guided_request(&mut self, _item: &MissionItem) -> bool {
        self.guided_ok
    }

    fn change_alt_request(&mut self, _item: &MissionItem) -> bool {
        self.guided_ok
    }

    fn gcs_heartbeat(&mut self, now_ms: u32) {
        self.last_gcs_heartbeat_ms = Some(now_ms);
    }

    fn set_rc_overrides(&mut self, channels: &[u16; 8]) -> bool {
        self.rc_overrides = Some(*channels);
        true
    }
}

impl SensorCalibration for MockVehicle {
    fn calibrate_gyros(&mut self) -> bool {
        self.calibrations += 1;
        self.gyro_cal_ok
    }

    fn calibrate_baro(&mut self) -> bool {
        self.calibrations += 1;
        self.baro_cal_ok
    }

    fn set_in_calibration(&mut self, active: bool) {
        self.in_calibration = active;
    }
}

impl MissionStore for MockVehicle {
    fn mission_count(&self) -> u16 {
        self.mission.len() as u16
    }

    fn mission_capacity(&self) -> u16 {
        self.mission_capacity
    }

    fn mission_item(&self, seq: u16) -> Option<MissionItem> {
        self.mission.get(seq as usize).copied()
    }

    fn replace_mission_item(&mut self, item: &MissionItem) -> Result<(), MissionStoreError> {
        let slot = self
            .mission
            .get_mut(item.seq as usize)
            .ok_or(MissionStoreError::InvalidIndex)?;
        *slot = *item;
        Ok(())
    }

    fn append_mission_item(&mut self, item: &MissionItem) -> Result<(), MissionStoreError> {
        if self.mission.len() >= self.mission_capacity as usize {
            return Err(MissionStoreError::Full);
        }
        self.mission.push(*item);
        Ok(())
    }

    fn truncate_mission(&mut self, count: u16) {
        self.mission.truncate(count as usize);
    }

    fn clear_mission(&mut self) -> bool {
        self.mission.clear();
        self.current_item = 0;
        true
    }

    fn current_mission_item(&self) -> u16 {
        self.current_item
    }

    fn set_current_mission_item(&mut self, seq: u16) -> bool {
        if (seq as usize) < self.mission.len() {
            self.current_item = seq;
            true
        } else {
            false
        }
    }

    fn mission_upload_complete(&mut self) {
        self.upload_completions += 1;
    }
}

impl GeofenceStore for MockVehicle {
    fn fence_present(&self) -> bool {
        self.fence_total > 0
    }

    fn fence_action_is_none(&self) -> bool {
        self.fence_action_none
    }

    fn fence_total(&self) -> u8 {
        self.fence_total
    }

    fn fence_point(&self, index: u8) -> Option<(i32, i32)> {
        if index >= self.fence_total {
            return None;
        }
        self.fence_points.get(index as usize).copied()
    }

    fn set_fence_point(&mut self, index: u8, lat: i32, lng: i32) -> bool {
        match self.fence_points.get_mut(index as usize) {
            Some(slot) => {
                *slot = (lat, lng);
                true
            }
            None => false,
        }
    }

    fn set_fence_enabled(&mut self, enabled: bool) -> bool {
        self.fence_enabled = enabled;
        true
    }
}

impl RallyStore for MockVehicle {
    fn rally_total(&self) -> u8 {
        self.rally_total
    }

    fn rally_max(&self) -> u8 {
        self.rally_max
    }

    fn rally_point(&self, index: u8) -> Option<RallyPoint> {
        self.rally_points.get(index as usize).copied().flatten()
    }

    fn set_rally_point(&mut self, index: u8, point: RallyPoint) -> bool {
        match self.rally_points.get_mut(index as usize) {
            Some(slot) => {
                *slot = Some(point);
                true
            }
            None => false,
        }
    }
}

impl ParameterStore for MockVehicle {
    fn param_count(&self) -> u16 {
        self.params.len() as u16
    }

    fn param(&self, index: u16) -> Option<ParamEntry> {
        self.params.get(index as usize).cloned()
    }

    fn find_param(&self, name: &str) -> Option<u16> {
        self.params
            .iter()
            .position(|entry| entry.name.as_str() == name)
            .map(|index| index as u16)
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<u16, ParamError> {
        let index = self.find_param(name).ok_or(ParamError::NotFound)?;
        self.params[index as usize].value = value;
        Ok(index)
    }
}

impl AuxiliaryInputs for MockVehicle {
    fn handle_log_request(&mut self, _message: &MavMessage, _download_active: bool) {
        self.log_requests += 1;
    }

    fn log_send(&mut self, _frames: &mut TelemetryFrames, download_active: bool) {
        if download_active {
            self.log_frames += 1;
        }
    }

    fn serial_control(&mut self, _message: &MavMessage) {
        self.forwarded += 1;
    }

    fn inject_gps(&mut self, _message: &MavMessage) {
        self.forwarded += 1;
    }

    fn radio_status(&mut self, _status: &RADIO_STATUS_DATA) {
        self.radio_reports += 1;
    }

    fn manual_control(&mut self, _input: &MANUAL_CONTROL_DATA) {
        self.manual_inputs += 1;
    }

    fn tracking_position(&mut self, _position: &GLOBAL_POSITION_INT_DATA) {
        self.tracking_updates += 1;
    }

    fn tracking_pressure(&mut self, _pressure: &SCALED_PRESSURE_DATA) {
        self.tracking_updates += 1;
    }
}
