//! Command Identifiers and Decoding Helpers
//!
//! Numeric `MAV_CMD` ids used by the command tables, plus the pure parts of
//! command decoding: `MAV_MODE` interpretation and the composite
//! preflight-calibration plan.

use heapless::Vec;

pub const MAV_CMD_NAV_WAYPOINT: u16 = 16;
pub const MAV_CMD_NAV_LOITER_UNLIM: u16 = 17;
pub const MAV_CMD_NAV_RETURN_TO_LAUNCH: u16 = 20;
pub const MAV_CMD_DO_SET_MODE: u16 = 176;
pub const MAV_CMD_DO_JUMP: u16 = 177;
pub const MAV_CMD_DO_SET_HOME: u16 = 179;
pub const MAV_CMD_DO_SET_RELAY: u16 = 181;
pub const MAV_CMD_DO_REPEAT_RELAY: u16 = 182;
pub const MAV_CMD_DO_SET_SERVO: u16 = 183;
pub const MAV_CMD_DO_REPEAT_SERVO: u16 = 184;
pub const MAV_CMD_DO_LAND_START: u16 = 189;
pub const MAV_CMD_DO_GO_AROUND: u16 = 191;
pub const MAV_CMD_DO_SET_ROI: u16 = 201;
pub const MAV_CMD_DO_DIGICAM_CONFIGURE: u16 = 202;
pub const MAV_CMD_DO_DIGICAM_CONTROL: u16 = 203;
pub const MAV_CMD_DO_MOUNT_CONTROL: u16 = 205;
pub const MAV_CMD_DO_FENCE_ENABLE: u16 = 207;
pub const MAV_CMD_DO_PARACHUTE: u16 = 208;
pub const MAV_CMD_DO_AUTOTUNE_ENABLE: u16 = 212;
pub const MAV_CMD_PREFLIGHT_CALIBRATION: u16 = 241;
pub const MAV_CMD_PREFLIGHT_SET_SENSOR_OFFSETS: u16 = 242;
pub const MAV_CMD_PREFLIGHT_REBOOT_SHUTDOWN: u16 = 246;
pub const MAV_CMD_MISSION_START: u16 = 300;
pub const MAV_CMD_COMPONENT_ARM_DISARM: u16 = 400;
pub const MAV_CMD_GET_HOME_POSITION: u16 = 410;
pub const MAV_CMD_START_RX_PAIR: u16 = 500;
pub const MAV_CMD_REQUEST_MESSAGE: u16 = 512;
pub const MAV_CMD_REQUEST_AUTOPILOT_CAPABILITIES: u16 = 520;
pub const MAV_CMD_DO_VTOL_TRANSITION: u16 = 3000;
pub const MAV_CMD_DO_START_MAG_CAL: u16 = 42424;
pub const MAV_CMD_DO_ACCEPT_MAG_CAL: u16 = 42425;
pub const MAV_CMD_DO_CANCEL_MAG_CAL: u16 = 42426;

/// `MAV_COMP_ID_SYSTEM_CONTROL`
pub const MAV_COMP_ID_SYSTEM_CONTROL: u8 = 250;

/// Flight mode families reachable through generic commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    Manual,
    Stabilize,
    Auto,
    Loiter,
    ReturnToLaunch,
}

/// Decode a `MAV_MODE` value (DO_SET_MODE param1) into a mode family.
///
/// Armed and disarmed variants map to the same family; arming state is not
/// changed by a mode request.
pub fn mode_from_mav_mode(mav_mode: u8) -> Option<ModeRequest> {
    match mav_mode {
        // MAV_MODE_MANUAL_DISARMED / MAV_MODE_MANUAL_ARMED
        64 | 192 => Some(ModeRequest::Manual),
        // MAV_MODE_STABILIZE_DISARMED / MAV_MODE_STABILIZE_ARMED
        80 | 208 => Some(ModeRequest::Stabilize),
        // MAV_MODE_AUTO_DISARMED / MAV_MODE_AUTO_ARMED
        92 | 220 => Some(ModeRequest::Auto),
        _ => None,
    }
}

/// `PARACHUTE_ACTION`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParachuteAction {
    Disable,
    Enable,
    Release,
}

impl ParachuteAction {
    pub fn from_param(param: u16) -> Option<Self> {
        match param {
            0 => Some(ParachuteAction::Disable),
            1 => Some(ParachuteAction::Enable),
            2 => Some(ParachuteAction::Release),
            _ => None,
        }
    }
}

/// One sub-action of PREFLIGHT_CALIBRATION
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStep {
    /// param1 = 1
    Gyro,
    /// param3 = 1
    Baro,
    /// param4 = 1
    RadioTrim,
    /// param5 = 1
    Accel,
    /// param5 = 2
    AccelTrim,
}

/// How the sub-action results of a composite calibration combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPolicy {
    /// Any failed sub-action fails the command
    Strict,
    /// Once any sub-action is recognised the command reports success,
    /// whatever the individual outcomes were
    AcceptRecognized,
}

/// Combined outcome of a composite calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    Accepted,
    Failed,
    /// No parameter selected a known sub-action
    Unsupported,
}

impl CalibrationPolicy {
    pub fn combine(self, results: &[(CalibrationStep, bool)]) -> CalibrationOutcome {
        if results.is_empty() {
            return CalibrationOutcome::Unsupported;
        }
        match self {
            CalibrationPolicy::AcceptRecognized => CalibrationOutcome::Accepted,
            CalibrationPolicy::Strict => {
                if results.iter().all(|(_, ok)| *ok) {
                    CalibrationOutcome::Accepted
                } else {
                    CalibrationOutcome::Failed
                }
            }
        }
    }
}

fn is_one(value: f32) -> bool {
    value == 1.0
}

/// Sub-actions selected by PREFLIGHT_CALIBRATION parameters.
///
/// Gyro and baro are independent; radio trim, accel and accel trim share
/// one slot with radio trim taking precedence.
pub fn calibration_plan(param1: f32, param3: f32, param4: f32, param5: f32) -> Vec<CalibrationStep, 3> {
    let mut steps = Vec::new();
    if is_one(param1) {
        let _ = steps.push(CalibrationStep::Gyro);
    }
    if is_one(param3) {
        let _ = steps.push(CalibrationStep::Baro);
    }
    if is_one(param4) {
        let _ = steps.push(CalibrationStep::RadioTrim);
    } else if is_one(param5) {
        let _ = steps.push(CalibrationStep::Accel);
    } else if param5 == 2.0 {
        let _ = steps.push(CalibrationStep::AccelTrim);
    }
    steps
}
