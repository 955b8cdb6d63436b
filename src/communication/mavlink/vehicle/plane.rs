//! Fixed-wing plane profile
//!
//! Full mission protocol with fence and rally storage. Telemetry yields to
//! the flight loop: sends are skipped once the main loop is short of time.

use pico_trail_gcs_core::command::{
    CalibrationPolicy, ModeRequest, MAV_CMD_COMPONENT_ARM_DISARM, MAV_CMD_DO_ACCEPT_MAG_CAL,
    MAV_CMD_DO_AUTOTUNE_ENABLE, MAV_CMD_DO_CANCEL_MAG_CAL, MAV_CMD_DO_DIGICAM_CONFIGURE,
    MAV_CMD_DO_DIGICAM_CONTROL, MAV_CMD_DO_FENCE_ENABLE, MAV_CMD_DO_GO_AROUND,
    MAV_CMD_DO_LAND_START, MAV_CMD_DO_MOUNT_CONTROL, MAV_CMD_DO_PARACHUTE,
    MAV_CMD_DO_REPEAT_RELAY, MAV_CMD_DO_REPEAT_SERVO, MAV_CMD_DO_SET_HOME, MAV_CMD_DO_SET_MODE,
    MAV_CMD_DO_SET_RELAY, MAV_CMD_DO_SET_ROI, MAV_CMD_DO_SET_SERVO, MAV_CMD_DO_START_MAG_CAL,
    MAV_CMD_DO_VTOL_TRANSITION, MAV_CMD_GET_HOME_POSITION, MAV_CMD_MISSION_START,
    MAV_CMD_NAV_LOITER_UNLIM, MAV_CMD_NAV_RETURN_TO_LAUNCH, MAV_CMD_PREFLIGHT_CALIBRATION,
    MAV_CMD_PREFLIGHT_REBOOT_SHUTDOWN, MAV_CMD_PREFLIGHT_SET_SENSOR_OFFSETS,
    MAV_CMD_REQUEST_AUTOPILOT_CAPABILITIES, MAV_CMD_REQUEST_MESSAGE, MAV_CMD_START_RX_PAIR,
};
use pico_trail_gcs_core::{MessageId, StreamId};

use super::{
    Backpressure, InboundFeatures, MissionProtocol, StreamSpec, Vehicle, VehicleProfile,
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
            MessageId::CurrentWaypoint,
            MessageId::GpsRaw,
            MessageId::NavControllerOutput,
            MessageId::FenceStatus,
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
        messages: &[MessageId::RadioOut, MessageId::RadioIn],
    },
    StreamSpec {
        stream: StreamId::Extra1,
        messages: &[
            MessageId::Attitude,
            MessageId::SimState,
            MessageId::Rpm,
            MessageId::PidTuning,
        ],
    },
    StreamSpec {
        stream: StreamId::Extra2,
        messages: &[MessageId::VfrHud],
    },
    StreamSpec {
        stream: StreamId::Extra3,
        messages: &[
            MessageId::Ahrs,
            MessageId::HwStatus,
            MessageId::Wind,
            MessageId::Rangefinder,
            MessageId::SystemTime,
            MessageId::Terrain,
            MessageId::MagCalReport,
            MessageId::MagCalProgress,
            MessageId::Battery2,
            MessageId::MountStatus,
            MessageId::OpticalFlow,
            MessageId::EkfStatusReport,
            MessageId::GimbalReport,
            MessageId::Vibration,
        ],
    },
];

const COMMANDS: &[CommandEntry] = &[
    CommandEntry::new(MAV_CMD_START_RX_PAIR, cmd::rx_pair),
    CommandEntry::new(MAV_CMD_NAV_LOITER_UNLIM, cmd::loiter_unlimited),
    CommandEntry::new(MAV_CMD_NAV_RETURN_TO_LAUNCH, cmd::return_to_launch),
    CommandEntry::new(MAV_CMD_MISSION_START, cmd::mission_start),
    CommandEntry::new(MAV_CMD_DO_SET_ROI, cmd::set_roi),
    CommandEntry::new(MAV_CMD_DO_DIGICAM_CONFIGURE, cmd::digicam_configure),
    CommandEntry::new(MAV_CMD_DO_DIGICAM_CONTROL, cmd::digicam_control),
    CommandEntry::new(MAV_CMD_DO_MOUNT_CONTROL, cmd::mount_control),
    CommandEntry::new(MAV_CMD_PREFLIGHT_CALIBRATION, cmd::preflight_calibration),
    CommandEntry::new(MAV_CMD_PREFLIGHT_SET_SENSOR_OFFSETS, cmd::set_sensor_offsets),
    CommandEntry::new(MAV_CMD_COMPONENT_ARM_DISARM, cmd::arm_disarm),
    CommandEntry::new(MAV_CMD_GET_HOME_POSITION, cmd::get_home_position),
    CommandEntry::new(MAV_CMD_DO_SET_MODE, cmd::set_mode),
    CommandEntry::new(MAV_CMD_DO_SET_SERVO, cmd::set_servo),
    CommandEntry::new(MAV_CMD_DO_REPEAT_SERVO, cmd::repeat_servo),
    CommandEntry::new(MAV_CMD_DO_SET_RELAY, cmd::set_relay),
    CommandEntry::new(MAV_CMD_DO_REPEAT_RELAY, cmd::repeat_relay),
    CommandEntry::new(MAV_CMD_PREFLIGHT_REBOOT_SHUTDOWN, cmd::reboot),
    CommandEntry::new(MAV_CMD_DO_LAND_START, cmd::land_start),
    CommandEntry::new(MAV_CMD_DO_GO_AROUND, cmd::go_around),
    CommandEntry::new(MAV_CMD_DO_FENCE_ENABLE, cmd::fence_enable),
    CommandEntry::new(
        MAV_CMD_REQUEST_AUTOPILOT_CAPABILITIES,
        cmd::request_autopilot_capabilities,
    ),
    CommandEntry::new(MAV_CMD_DO_SET_HOME, cmd::set_home),
    CommandEntry::new(MAV_CMD_DO_AUTOTUNE_ENABLE, cmd::autotune_enable),
    CommandEntry::new(MAV_CMD_DO_START_MAG_CAL, cmd::mag_cal),
    CommandEntry::new(MAV_CMD_DO_ACCEPT_MAG_CAL, cmd::mag_cal),
    CommandEntry::new(MAV_CMD_DO_CANCEL_MAG_CAL, cmd::mag_cal),
    CommandEntry::new(MAV_CMD_DO_PARACHUTE, cmd::parachute),
    CommandEntry::new(MAV_CMD_DO_VTOL_TRANSITION, cmd::vtol_transition),
    CommandEntry::new(MAV_CMD_REQUEST_MESSAGE, cmd::request_message),
];

/// Navigation and tuning output is meaningless while flying manually
fn plane_gate(id: MessageId, vehicle: &dyn Vehicle) -> bool {
    match id {
        MessageId::PidTuning | MessageId::NavControllerOutput => !vehicle.in_manual_mode(),
        _ => true,
    }
}

pub static PLANE: VehicleProfile = VehicleProfile {
    name: "Plane",
    streams: STREAMS,
    placeholders: &[],
    message_gate: plane_gate,
    commands: COMMANDS,
    modes: &[
        ModeRequest::Manual,
        ModeRequest::Stabilize,
        ModeRequest::Auto,
        ModeRequest::Loiter,
        ModeRequest::ReturnToLaunch,
    ],
    backpressure: Backpressure {
        honour_telemetry_delay: true,
        enforce_time_budget: true,
    },
    mission: MissionProtocol::Full,
    features: InboundFeatures::GEOFENCE
        .union(InboundFeatures::RALLY)
        .union(InboundFeatures::RC_OVERRIDE)
        .union(InboundFeatures::SET_HOME_POSITION)
        .union(InboundFeatures::GCS_FAILSAFE),
    arm_component: None,
    calibration: CalibrationPolicy::Strict,
    calibration_requires_disarmed: true,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mavlink::mock::MockVehicle;

    #[test]
    fn test_manual_mode_gate() {
        let mut vehicle = MockVehicle::new();
        assert!(plane_gate(MessageId::PidTuning, &vehicle));

        vehicle.manual_mode = true;
        assert!(!plane_gate(MessageId::PidTuning, &vehicle));
        assert!(!plane_gate(MessageId::NavControllerOutput, &vehicle));
        assert!(plane_gate(MessageId::Attitude, &vehicle));
    }

    #[test]
    fn test_stream_order_is_priority_order() {
        let order: std::vec::Vec<StreamId> = PLANE.streams.iter().map(|s| s.stream).collect();
        assert_eq!(
            order,
            [
                StreamId::RawSensors,
                StreamId::ExtendedStatus,
                StreamId::Position,
                StreamId::RawController,
                StreamId::RcChannels,
                StreamId::Extra1,
                StreamId::Extra2,
                StreamId::Extra3,
            ]
        );
    }
}
