//! Antenna tracker profile
//!
//! The tracker follows another vehicle, so the only mission item it accepts
//! is its own home position. It never throttles sends on main-loop time.

use pico_trail_gcs_core::command::{
    CalibrationPolicy, ModeRequest, MAV_CMD_COMPONENT_ARM_DISARM, MAV_CMD_DO_ACCEPT_MAG_CAL,
    MAV_CMD_DO_CANCEL_MAG_CAL, MAV_CMD_DO_SET_MODE, MAV_CMD_DO_SET_SERVO,
    MAV_CMD_DO_START_MAG_CAL, MAV_CMD_GET_HOME_POSITION, MAV_CMD_MISSION_START,
    MAV_CMD_PREFLIGHT_CALIBRATION, MAV_CMD_PREFLIGHT_REBOOT_SHUTDOWN,
    MAV_CMD_REQUEST_AUTOPILOT_CAPABILITIES, MAV_CMD_REQUEST_MESSAGE, MAV_COMP_ID_SYSTEM_CONTROL,
};
use pico_trail_gcs_core::{MessageId, StreamId};

use super::{
    allow_all, Backpressure, InboundFeatures, MissionProtocol, StreamSpec, VehicleProfile,
};
use crate::communication::mavlink::handlers::command::{self as cmd, CommandEntry};

const STREAMS: &[StreamSpec] = &[
    StreamSpec {
        stream: StreamId::RawSensors,
        messages: &[MessageId::RawImu1, MessageId::RawImu2, MessageId::RawImu3],
    },
    StreamSpec {
        stream: StreamId::ExtendedStatus,
        messages: &[
            MessageId::ExtendedStatus1,
            MessageId::ExtendedStatus2,
            MessageId::NavControllerOutput,
            MessageId::GpsRaw,
        ],
    },
    StreamSpec {
        stream: StreamId::Position,
        messages: &[MessageId::Location, MessageId::LocalPosition],
    },
    StreamSpec {
        stream: StreamId::RawController,
        messages: &[MessageId::ServoOut],
    },
    StreamSpec {
        stream: StreamId::RcChannels,
        messages: &[MessageId::RadioIn, MessageId::RadioOut],
    },
    StreamSpec {
        stream: StreamId::Extra1,
        messages: &[MessageId::Attitude],
    },
    StreamSpec {
        stream: StreamId::Extra3,
        messages: &[
            MessageId::Ahrs,
            MessageId::HwStatus,
            MessageId::SimState,
            MessageId::MagCalReport,
            MessageId::MagCalProgress,
        ],
    },
];

/// Recognised, scheduled, but nothing to report on a tracker
const PLACEHOLDERS: &[MessageId] = &[
    MessageId::ServoOut,
    MessageId::ExtendedStatus1,
    MessageId::ExtendedStatus2,
    MessageId::CurrentWaypoint,
    MessageId::VfrHud,
    MessageId::SystemTime,
    MessageId::FenceStatus,
    MessageId::Wind,
    MessageId::Rangefinder,
    MessageId::Terrain,
    MessageId::Battery2,
    MessageId::CameraFeedback,
    MessageId::MountStatus,
    MessageId::OpticalFlow,
    MessageId::GimbalReport,
    MessageId::EkfStatusReport,
    MessageId::PidTuning,
    MessageId::Vibration,
    MessageId::Rpm,
    MessageId::MissionItemReached,
];

const COMMANDS: &[CommandEntry] = &[
    CommandEntry::new(MAV_CMD_PREFLIGHT_CALIBRATION, cmd::preflight_calibration),
    CommandEntry::new(MAV_CMD_COMPONENT_ARM_DISARM, cmd::arm_disarm),
    CommandEntry::new(MAV_CMD_GET_HOME_POSITION, cmd::get_home_position),
    CommandEntry::new(MAV_CMD_DO_SET_MODE, cmd::set_mode),
    CommandEntry::new(MAV_CMD_DO_SET_SERVO, cmd::set_servo),
    CommandEntry::new(MAV_CMD_MISSION_START, cmd::mission_start),
    CommandEntry::new(MAV_CMD_PREFLIGHT_REBOOT_SHUTDOWN, cmd::reboot),
    CommandEntry::new(
        MAV_CMD_REQUEST_AUTOPILOT_CAPABILITIES,
        cmd::request_autopilot_capabilities,
    ),
    CommandEntry::new(MAV_CMD_DO_START_MAG_CAL, cmd::mag_cal),
    CommandEntry::new(MAV_CMD_DO_ACCEPT_MAG_CAL, cmd::mag_cal),
    CommandEntry::new(MAV_CMD_DO_CANCEL_MAG_CAL, cmd::mag_cal),
    CommandEntry::new(MAV_CMD_REQUEST_MESSAGE, cmd::request_message),
];

pub static TRACKER: VehicleProfile = VehicleProfile {
    name: "AntennaTracker",
    streams: STREAMS,
    placeholders: PLACEHOLDERS,
    message_gate: allow_all,
    commands: COMMANDS,
    modes: &[ModeRequest::Manual, ModeRequest::Auto],
    backpressure: Backpressure {
        honour_telemetry_delay: false,
        enforce_time_budget: false,
    },
    mission: MissionProtocol::HomeOnly,
    features: InboundFeatures::TRACKING_INPUTS,
    arm_component: Some(MAV_COMP_ID_SYSTEM_CONTROL),
    calibration: CalibrationPolicy::AcceptRecognized,
    calibration_requires_disarmed: false,
};
