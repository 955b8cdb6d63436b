//! Command Protocol Handler
//!
//! Handles COMMAND_LONG messages from the ground control station.
//!
//! # Command Flow
//!
//! 1. GCS sends COMMAND_LONG
//! 2. The command id is looked up in the vehicle profile's command table
//! 3. The entry's handler performs exactly one side-effect path through the
//!    vehicle collaborators and returns a `MavResult`
//! 4. Exactly one COMMAND_ACK carrying that result is sent back
//!
//! Commands missing from the table are answered with UNSUPPORTED and have
//! no side effect. Handlers that change vehicle state only report ACCEPTED
//! once the collaborator confirms the change.

use mavlink::ardupilotmega::{
    MavMessage, MavProtocolCapability, MavResult, MavSeverity, AUTOPILOT_VERSION_DATA,
    COMMAND_ACK_DATA, COMMAND_LONG_DATA, HOME_POSITION_DATA, PROTOCOL_VERSION_DATA,
};
use pico_trail_gcs_core::command::{
    calibration_plan, mode_from_mav_mode, CalibrationOutcome, CalibrationStep, ModeRequest,
    ParachuteAction,
};
use pico_trail_gcs_core::message::wire;
use pico_trail_gcs_core::Location;

use super::HandlerContext;
use crate::communication::mavlink::channel::ChannelEvent;
use crate::communication::mavlink::config::GcsConfig;
use crate::communication::mavlink::status_notifier::format_line;

/// MAVLink protocol version (MAVLink 2.0)
pub const MAVLINK_VERSION: u16 = 200;

/// Minimum supported MAVLink protocol version
pub const MAVLINK_MIN_VERSION: u16 = 200;

/// Maximum supported MAVLink protocol version
pub const MAVLINK_MAX_VERSION: u16 = 200;

/// Handler signature shared by every command table entry
pub type CommandFn = fn(&mut HandlerContext<'_>, &COMMAND_LONG_DATA) -> MavResult;

/// One row of a vehicle's command table
#[derive(Clone, Copy)]
pub struct CommandEntry {
    /// `MAV_CMD_*` number
    pub command: u16,
    pub handler: CommandFn,
}

impl CommandEntry {
    pub const fn new(command: u16, handler: CommandFn) -> Self {
        Self { command, handler }
    }
}

impl core::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("command", &self.command)
            .finish()
    }
}

/// Handle COMMAND_LONG and queue its COMMAND_ACK.
///
/// Always produces exactly one acknowledgement, whatever branch is taken.
pub fn handle_command_long(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    let command = cmd.command as u16;
    crate::log_debug!("Received COMMAND_LONG: command={}", command);

    let result = match ctx.profile.command(command) {
        Some(entry) => (entry.handler)(ctx, cmd),
        None => {
            crate::log_warn!("Unsupported command: {}", command);
            MavResult::MAV_RESULT_UNSUPPORTED
        }
    };

    let ack = COMMAND_ACK_DATA {
        command: cmd.command,
        result,
        progress: 0,
        result_param2: 0,
        target_system: ctx.source.system_id,
        target_component: ctx.source.component_id,
    };
    ctx.reply(MavMessage::COMMAND_ACK(ack));
    result
}

fn accepted_if(ok: bool) -> MavResult {
    if ok {
        MavResult::MAV_RESULT_ACCEPTED
    } else {
        MavResult::MAV_RESULT_FAILED
    }
}

/// param1: 1 arm, 0 disarm
pub fn arm_disarm(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    if let Some(component) = ctx.profile.arm_component {
        if cmd.target_component != component {
            return MavResult::MAV_RESULT_UNSUPPORTED;
        }
    }

    if cmd.param1 == 1.0 {
        let armed = ctx.vehicle.arm();
        if !armed {
            crate::log_warn!("Arm request refused by vehicle");
        }
        accepted_if(armed)
    } else if cmd.param1 == 0.0 {
        accepted_if(ctx.vehicle.disarm())
    } else {
        MavResult::MAV_RESULT_UNSUPPORTED
    }
}

/// param1: MAV_MODE (manual / stabilize / auto, armed or disarmed)
pub fn set_mode(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    let raw = cmd.param1 as u16;
    let Some(mode) = u8::try_from(raw).ok().and_then(mode_from_mav_mode) else {
        return MavResult::MAV_RESULT_UNSUPPORTED;
    };
    if !ctx.profile.modes.contains(&mode) {
        return MavResult::MAV_RESULT_UNSUPPORTED;
    }
    accepted_if(ctx.vehicle.set_mode(mode))
}

pub fn mission_start(ctx: &mut HandlerContext<'_>, _cmd: &COMMAND_LONG_DATA) -> MavResult {
    accepted_if(ctx.vehicle.set_mode(ModeRequest::Auto))
}

pub fn loiter_unlimited(ctx: &mut HandlerContext<'_>, _cmd: &COMMAND_LONG_DATA) -> MavResult {
    accepted_if(ctx.vehicle.set_mode(ModeRequest::Loiter))
}

pub fn return_to_launch(ctx: &mut HandlerContext<'_>, _cmd: &COMMAND_LONG_DATA) -> MavResult {
    accepted_if(ctx.vehicle.set_mode(ModeRequest::ReturnToLaunch))
}

/// Composite calibration: param1 gyro, param3 baro, param4 radio trim,
/// param5 accel (1) or accel trim (2)
pub fn preflight_calibration(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    if ctx.profile.calibration_requires_disarmed && ctx.vehicle.is_armed() {
        crate::log_warn!("Calibration refused while armed");
        return MavResult::MAV_RESULT_FAILED;
    }

    let plan = calibration_plan(cmd.param1, cmd.param3, cmd.param4, cmd.param5);
    if plan.is_empty() {
        ctx.send_text(
            MavSeverity::MAV_SEVERITY_WARNING,
            "Unsupported preflight calibration",
        );
    }

    ctx.vehicle.set_in_calibration(true);
    let mut results: heapless::Vec<(CalibrationStep, bool), 3> = heapless::Vec::new();
    for step in plan {
        let ok = match step {
            CalibrationStep::Gyro => ctx.vehicle.calibrate_gyros(),
            CalibrationStep::Baro => ctx.vehicle.calibrate_baro(),
            CalibrationStep::RadioTrim => ctx.vehicle.trim_radio(),
            CalibrationStep::Accel => ctx.vehicle.calibrate_accel(),
            CalibrationStep::AccelTrim => ctx.vehicle.calibrate_accel_trim(),
        };
        let _ = results.push((step, ok));
    }
    ctx.vehicle.set_in_calibration(false);

    match ctx.profile.calibration.combine(&results) {
        CalibrationOutcome::Accepted => MavResult::MAV_RESULT_ACCEPTED,
        CalibrationOutcome::Failed => MavResult::MAV_RESULT_FAILED,
        CalibrationOutcome::Unsupported => MavResult::MAV_RESULT_UNSUPPORTED,
    }
}

/// param1: 2 first compass, 5 second compass; param2..4 offsets
pub fn set_sensor_offsets(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    let compass = if cmd.param1 == 2.0 {
        0
    } else if cmd.param1 == 5.0 {
        1
    } else {
        return MavResult::MAV_RESULT_UNSUPPORTED;
    };
    accepted_if(
        ctx.vehicle
            .set_compass_offsets(compass, [cmd.param2, cmd.param3, cmd.param4]),
    )
}

pub fn mag_cal(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    ctx.vehicle.mag_cal_command(cmd.command as u16, cmd)
}

pub fn get_home_position(ctx: &mut HandlerContext<'_>, _cmd: &COMMAND_LONG_DATA) -> MavResult {
    match ctx.vehicle.home() {
        Some(home) => {
            ctx.reply(home_position_message(&home));
            MavResult::MAV_RESULT_ACCEPTED
        }
        None => MavResult::MAV_RESULT_FAILED,
    }
}

/// param1: 1 use current location; otherwise param5/6/7 lat, lng, alt
pub fn set_home(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    if cmd.param1 == 1.0 {
        if !ctx.vehicle.set_home_to_current() {
            return MavResult::MAV_RESULT_FAILED;
        }
        if let Some(home) = ctx.vehicle.home() {
            ctx.raise(ChannelEvent::HomeChanged(home));
        }
        return MavResult::MAV_RESULT_ACCEPTED;
    }

    let home = match Location::home_from_degrees(cmd.param5, cmd.param6, cmd.param7) {
        Ok(home) => home,
        Err(_) => {
            crate::log_warn!("DO_SET_HOME rejected: invalid location");
            return MavResult::MAV_RESULT_FAILED;
        }
    };
    if !ctx.vehicle.set_home(home) {
        return MavResult::MAV_RESULT_FAILED;
    }
    ctx.raise(ChannelEvent::HomeChanged(home));
    MavResult::MAV_RESULT_ACCEPTED
}

pub fn set_servo(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    accepted_if(ctx.vehicle.set_servo(cmd.param1 as u8, cmd.param2 as u16))
}

/// param3 repeat count, param4 cycle time in seconds
pub fn repeat_servo(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    accepted_if(ctx.vehicle.repeat_servo(
        cmd.param1 as u8,
        cmd.param2 as u16,
        cmd.param3 as u16,
        (cmd.param4 * 1000.0) as u32,
    ))
}

pub fn set_relay(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    accepted_if(ctx.vehicle.set_relay(cmd.param1 as u8, cmd.param2 != 0.0))
}

/// param2 repeat count, param3 cycle time in seconds
pub fn repeat_relay(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    accepted_if(ctx.vehicle.repeat_relay(
        cmd.param1 as u8,
        cmd.param2 as u16,
        (cmd.param3 * 1000.0) as u32,
    ))
}

/// param1: 1 reboot, 3 reboot and hold in bootloader
pub fn reboot(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    if cmd.param1 == 1.0 || cmd.param1 == 3.0 {
        ctx.vehicle.reboot(cmd.param1 == 3.0);
        MavResult::MAV_RESULT_ACCEPTED
    } else {
        MavResult::MAV_RESULT_UNSUPPORTED
    }
}

pub fn land_start(ctx: &mut HandlerContext<'_>, _cmd: &COMMAND_LONG_DATA) -> MavResult {
    accepted_if(ctx.vehicle.jump_to_landing_sequence())
}

/// param1: climb-out altitude in metres (0 keeps the default)
pub fn go_around(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    let climb_alt_cm = (cmd.param1 != 0.0).then(|| (cmd.param1 * 100.0) as i32);
    if ctx.vehicle.go_around(climb_alt_cm) {
        ctx.raise(ChannelEvent::Announce(
            MavSeverity::MAV_SEVERITY_INFO,
            format_line(format_args!("Go around command accepted")),
        ));
        MavResult::MAV_RESULT_ACCEPTED
    } else {
        ctx.raise(ChannelEvent::Announce(
            MavSeverity::MAV_SEVERITY_NOTICE,
            format_line(format_args!("Rejected go around command")),
        ));
        MavResult::MAV_RESULT_FAILED
    }
}

/// param1: 0 disable, 1 enable, 2 disable floor only
pub fn fence_enable(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    if !ctx.vehicle.fence_present() {
        return MavResult::MAV_RESULT_FAILED;
    }
    match cmd.param1 as u16 {
        0 => accepted_if(ctx.vehicle.set_fence_enabled(false)),
        1 => accepted_if(ctx.vehicle.set_fence_enabled(true)),
        2 => {
            if !ctx.vehicle.set_fence_floor_enabled(false) {
                return MavResult::MAV_RESULT_FAILED;
            }
            ctx.raise(ChannelEvent::Announce(
                MavSeverity::MAV_SEVERITY_NOTICE,
                format_line(format_args!("Fence floor disabled")),
            ));
            MavResult::MAV_RESULT_ACCEPTED
        }
        _ => MavResult::MAV_RESULT_FAILED,
    }
}

pub fn autotune_enable(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    ctx.vehicle.set_autotune(cmd.param1 != 0.0);
    MavResult::MAV_RESULT_ACCEPTED
}

pub fn parachute(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    let Some(action) = ParachuteAction::from_param(cmd.param1 as u16) else {
        return MavResult::MAV_RESULT_FAILED;
    };
    match ctx.vehicle.parachute(action) {
        Ok(()) => MavResult::MAV_RESULT_ACCEPTED,
        Err(reason) => {
            ctx.raise(ChannelEvent::Announce(
                MavSeverity::MAV_SEVERITY_NOTICE,
                format_line(format_args!("{}", reason)),
            ));
            MavResult::MAV_RESULT_FAILED
        }
    }
}

pub fn vtol_transition(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    ctx.vehicle.vtol_transition(cmd.param1 as u8)
}

pub fn rx_pair(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    accepted_if(ctx.vehicle.rc_bind(cmd.param1 as u8))
}

/// param5/6/7: ROI lat, lng, alt; all zero releases the mount
pub fn set_roi(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    if libm::fabsf(cmd.param5) > 90.0 || libm::fabsf(cmd.param6) > 180.0 {
        return MavResult::MAV_RESULT_FAILED;
    }
    let roi = Location::new(
        (cmd.param5 as f64 * 1.0e7) as i32,
        (cmd.param6 as f64 * 1.0e7) as i32,
        (cmd.param7 * 100.0) as i32,
    );
    if roi.lat == 0 && roi.lng == 0 && roi.alt_cm == 0 {
        ctx.vehicle.set_roi(None);
    } else {
        ctx.vehicle.set_roi(Some(roi));
    }
    MavResult::MAV_RESULT_ACCEPTED
}

pub fn digicam_configure(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    ctx.vehicle.camera_configure(cmd);
    MavResult::MAV_RESULT_ACCEPTED
}

pub fn digicam_control(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    if ctx.vehicle.camera_control(cmd) {
        crate::log_info!("Picture taken");
    }
    MavResult::MAV_RESULT_ACCEPTED
}

/// param1 pitch, param2 roll, param3 yaw, param7 MAV_MOUNT_MODE
pub fn mount_control(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    ctx.vehicle
        .mount_control(cmd.param1, cmd.param2, cmd.param3, cmd.param7 as u8);
    MavResult::MAV_RESULT_ACCEPTED
}

/// param1: 1 requests AUTOPILOT_VERSION
pub fn request_autopilot_capabilities(
    ctx: &mut HandlerContext<'_>,
    cmd: &COMMAND_LONG_DATA,
) -> MavResult {
    if cmd.param1 != 1.0 {
        return MavResult::MAV_RESULT_UNSUPPORTED;
    }
    ctx.reply(autopilot_version_message(ctx.config));
    MavResult::MAV_RESULT_ACCEPTED
}

/// param1: message id (AUTOPILOT_VERSION, HOME_POSITION or PROTOCOL_VERSION)
pub fn request_message(ctx: &mut HandlerContext<'_>, cmd: &COMMAND_LONG_DATA) -> MavResult {
    let message_id = cmd.param1 as u32;
    match message_id {
        wire::PROTOCOL_VERSION => {
            crate::log_debug!("Protocol version requested via MAV_CMD_REQUEST_MESSAGE");
            ctx.reply(MavMessage::PROTOCOL_VERSION(protocol_version_message()));
            MavResult::MAV_RESULT_ACCEPTED
        }
        wire::AUTOPILOT_VERSION => {
            ctx.reply(autopilot_version_message(ctx.config));
            MavResult::MAV_RESULT_ACCEPTED
        }
        wire::HOME_POSITION => get_home_position(ctx, cmd),
        _ => {
            crate::log_warn!("Unsupported message ID in REQUEST_MESSAGE: {}", message_id);
            MavResult::MAV_RESULT_UNSUPPORTED
        }
    }
}

/// PROTOCOL_VERSION payload
pub fn protocol_version_message() -> PROTOCOL_VERSION_DATA {
    PROTOCOL_VERSION_DATA {
        version: MAVLINK_VERSION,
        min_version: MAVLINK_MIN_VERSION,
        max_version: MAVLINK_MAX_VERSION,
        spec_version_hash: [0u8; 8],
        library_version_hash: [0u8; 8],
    }
}

/// AUTOPILOT_VERSION advertising float missions/params and MAVLink 2
pub fn autopilot_version_message(config: &GcsConfig) -> MavMessage {
    MavMessage::AUTOPILOT_VERSION(AUTOPILOT_VERSION_DATA {
        capabilities: MavProtocolCapability::MAV_PROTOCOL_CAPABILITY_MISSION_FLOAT
            | MavProtocolCapability::MAV_PROTOCOL_CAPABILITY_PARAM_FLOAT
            | MavProtocolCapability::MAV_PROTOCOL_CAPABILITY_MISSION_INT
            | MavProtocolCapability::MAV_PROTOCOL_CAPABILITY_MAVLINK2,
        flight_sw_version: config.flight_sw_version,
        ..Default::default()
    })
}

/// HOME_POSITION for `home` (altitude in millimetres)
pub fn home_position_message(home: &Location) -> MavMessage {
    MavMessage::HOME_POSITION(HOME_POSITION_DATA {
        latitude: home.lat,
        longitude: home.lng,
        altitude: home.alt_cm.saturating_mul(10),
        q: [1.0, 0.0, 0.0, 0.0],
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mavlink::mock::MockVehicle;
    use crate::communication::mavlink::status_notifier::StatusNotifier;
    use crate::communication::mavlink::vehicle::{PLANE, TRACKER};
    use crate::communication::mavlink::vehicle::VehicleProfile;
    use mavlink::ardupilotmega::MavCmd;
    use pico_trail_gcs_core::command::MAV_COMP_ID_SYSTEM_CONTROL;
    use pico_trail_gcs_core::Peer;

    fn command(cmd: MavCmd, params: [f32; 7]) -> COMMAND_LONG_DATA {
        COMMAND_LONG_DATA {
            param1: params[0],
            param2: params[1],
            param3: params[2],
            param4: params[3],
            param5: params[4],
            param6: params[5],
            param7: params[6],
            command: cmd,
            target_system: 1,
            target_component: 1,
            confirmation: 0,
        }
    }

    fn run(
        profile: &'static VehicleProfile,
        vehicle: &mut MockVehicle,
        cmd: &COMMAND_LONG_DATA,
    ) -> (MavResult, std::vec::Vec<MavMessage>, std::vec::Vec<ChannelEvent>) {
        let config = GcsConfig::default();
        let mut notifier = StatusNotifier::new();
        let mut ctx = HandlerContext::new(
            vehicle,
            profile,
            &config,
            &mut notifier,
            Peer::new(255, 190),
        );
        let result = handle_command_long(&mut ctx, cmd);
        let (replies, _, events) = ctx.finish();
        (
            result,
            replies.into_iter().collect(),
            events.into_iter().collect(),
        )
    }

    fn acks(replies: &[MavMessage]) -> std::vec::Vec<COMMAND_ACK_DATA> {
        replies
            .iter()
            .filter_map(|m| match m {
                MavMessage::COMMAND_ACK(ack) => Some(ack.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_arm_failure_reports_failed() {
        let mut vehicle = MockVehicle::new();
        vehicle.arm_allowed = false;
        let cmd = command(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let (result, replies, _) = run(&PLANE, &mut vehicle, &cmd);

        assert_eq!(result, MavResult::MAV_RESULT_FAILED);
        let acks = acks(&replies);
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].result, MavResult::MAV_RESULT_FAILED);
        assert_eq!(acks[0].target_system, 255);
        assert!(!vehicle.armed);
    }

    #[test]
    fn test_arm_and_disarm() {
        let mut vehicle = MockVehicle::new();
        let arm = command(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(run(&PLANE, &mut vehicle, &arm).0, MavResult::MAV_RESULT_ACCEPTED);
        assert!(vehicle.armed);

        let disarm = command(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, [0.0; 7]);
        assert_eq!(run(&PLANE, &mut vehicle, &disarm).0, MavResult::MAV_RESULT_ACCEPTED);
        assert!(!vehicle.armed);

        let bogus = command(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, [0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(run(&PLANE, &mut vehicle, &bogus).0, MavResult::MAV_RESULT_UNSUPPORTED);
    }

    #[test]
    fn test_tracker_arms_only_system_control() {
        let mut vehicle = MockVehicle::new();
        let mut arm = command(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(run(&TRACKER, &mut vehicle, &arm).0, MavResult::MAV_RESULT_UNSUPPORTED);
        assert!(!vehicle.armed);

        arm.target_component = MAV_COMP_ID_SYSTEM_CONTROL;
        assert_eq!(run(&TRACKER, &mut vehicle, &arm).0, MavResult::MAV_RESULT_ACCEPTED);
        assert!(vehicle.armed);
    }

    #[test]
    fn test_unknown_command_single_unsupported_ack() {
        let mut vehicle = MockVehicle::new();
        let cmd = command(MavCmd::MAV_CMD_DO_SET_ROI, [0.0; 7]);
        let (result, replies, _) = run(&TRACKER, &mut vehicle, &cmd);
        assert_eq!(result, MavResult::MAV_RESULT_UNSUPPORTED);
        assert_eq!(acks(&replies).len(), 1);
    }

    #[test]
    fn test_set_mode_respects_profile_modes() {
        let mut vehicle = MockVehicle::new();
        // MAV_MODE_STABILIZE_DISARMED
        let cmd = command(MavCmd::MAV_CMD_DO_SET_MODE, [80.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(run(&PLANE, &mut vehicle, &cmd).0, MavResult::MAV_RESULT_ACCEPTED);
        assert_eq!(vehicle.mode, Some(ModeRequest::Stabilize));

        vehicle.mode = None;
        assert_eq!(run(&TRACKER, &mut vehicle, &cmd).0, MavResult::MAV_RESULT_UNSUPPORTED);
        assert_eq!(vehicle.mode, None);
    }

    #[test]
    fn test_calibration_strict_vs_accept_recognized() {
        // Gyro fails, baro succeeds
        let cmd = command(
            MavCmd::MAV_CMD_PREFLIGHT_CALIBRATION,
            [1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        );

        let mut vehicle = MockVehicle::new();
        vehicle.gyro_cal_ok = false;
        assert_eq!(run(&PLANE, &mut vehicle, &cmd).0, MavResult::MAV_RESULT_FAILED);
        assert!(!vehicle.in_calibration);

        let mut vehicle = MockVehicle::new();
        vehicle.gyro_cal_ok = false;
        assert_eq!(run(&TRACKER, &mut vehicle, &cmd).0, MavResult::MAV_RESULT_ACCEPTED);
    }

    #[test]
    fn test_calibration_refused_while_armed() {
        let mut vehicle = MockVehicle::new();
        vehicle.armed = true;
        let cmd = command(
            MavCmd::MAV_CMD_PREFLIGHT_CALIBRATION,
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        );
        assert_eq!(run(&PLANE, &mut vehicle, &cmd).0, MavResult::MAV_RESULT_FAILED);
        assert_eq!(vehicle.calibrations, 0);
    }

    #[test]
    fn test_empty_calibration_is_unsupported_on_plane() {
        let mut vehicle = MockVehicle::new();
        let cmd = command(MavCmd::MAV_CMD_PREFLIGHT_CALIBRATION, [0.0; 7]);
        assert_eq!(run(&PLANE, &mut vehicle, &cmd).0, MavResult::MAV_RESULT_UNSUPPORTED);
    }

    #[test]
    fn test_set_home_raises_event() {
        let mut vehicle = MockVehicle::new();
        let cmd = command(
            MavCmd::MAV_CMD_DO_SET_HOME,
            [0.0, 0.0, 0.0, 0.0, 47.0, 8.0, 500.0],
        );
        let (result, _, events) = run(&PLANE, &mut vehicle, &cmd);
        assert_eq!(result, MavResult::MAV_RESULT_ACCEPTED);
        let home = vehicle.home.unwrap();
        assert_eq!((home.lat, home.lng, home.alt_cm), (470_000_000, 80_000_000, 50_000));
        assert!(matches!(events[..], [ChannelEvent::HomeChanged(h)] if h == home));
    }

    #[test]
    fn test_set_home_rejects_null_island_and_range() {
        let mut vehicle = MockVehicle::new();
        let zero = command(MavCmd::MAV_CMD_DO_SET_HOME, [0.0; 7]);
        assert_eq!(run(&PLANE, &mut vehicle, &zero).0, MavResult::MAV_RESULT_FAILED);

        let far = command(
            MavCmd::MAV_CMD_DO_SET_HOME,
            [0.0, 0.0, 0.0, 0.0, 91.0, 8.0, 0.0],
        );
        assert_eq!(run(&PLANE, &mut vehicle, &far).0, MavResult::MAV_RESULT_FAILED);
        assert!(vehicle.home.is_none());
    }

    #[test]
    fn test_get_home_position_reply() {
        let mut vehicle = MockVehicle::new();
        let cmd = command(MavCmd::MAV_CMD_GET_HOME_POSITION, [0.0; 7]);
        assert_eq!(run(&PLANE, &mut vehicle, &cmd).0, MavResult::MAV_RESULT_FAILED);

        vehicle.home = Some(Location::new(1, 2, 300));
        let (result, replies, _) = run(&PLANE, &mut vehicle, &cmd);
        assert_eq!(result, MavResult::MAV_RESULT_ACCEPTED);
        assert!(matches!(
            &replies[0],
            MavMessage::HOME_POSITION(h) if h.latitude == 1 && h.altitude == 3000
        ));
        assert!(matches!(&replies[1], MavMessage::COMMAND_ACK(_)));
    }

    #[test]
    fn test_request_protocol_version() {
        let mut vehicle = MockVehicle::new();
        let cmd = command(
            MavCmd::MAV_CMD_REQUEST_MESSAGE,
            [300.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        );
        let (result, replies, _) = run(&TRACKER, &mut vehicle, &cmd);
        assert_eq!(result, MavResult::MAV_RESULT_ACCEPTED);
        assert!(matches!(
            &replies[0],
            MavMessage::PROTOCOL_VERSION(v) if v.version == MAVLINK_VERSION
        ));
    }

    #[test]
    fn test_fence_enable_requires_fence() {
        let mut vehicle = MockVehicle::new();
        let cmd = command(MavCmd::MAV_CMD_DO_FENCE_ENABLE, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(run(&PLANE, &mut vehicle, &cmd).0, MavResult::MAV_RESULT_FAILED);

        vehicle.fence_total = 4;
        assert_eq!(run(&PLANE, &mut vehicle, &cmd).0, MavResult::MAV_RESULT_ACCEPTED);
        assert!(vehicle.fence_enabled);
    }

    #[test]
    fn test_go_around_announces() {
        let mut vehicle = MockVehicle::new();
        let cmd = command(MavCmd::MAV_CMD_DO_GO_AROUND, [0.0; 7]);
        let (result, _, events) = run(&PLANE, &mut vehicle, &cmd);
        assert_eq!(result, MavResult::MAV_RESULT_FAILED);
        assert!(matches!(
            &events[..],
            [ChannelEvent::Announce(MavSeverity::MAV_SEVERITY_NOTICE, text)]
                if text.as_str() == "Rejected go around command"
        ));
    }

    #[test]
    fn test_reboot_param_values() {
        let mut vehicle = MockVehicle::new();
        let hold = command(
            MavCmd::MAV_CMD_PREFLIGHT_REBOOT_SHUTDOWN,
            [3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        );
        assert_eq!(run(&PLANE, &mut vehicle, &hold).0, MavResult::MAV_RESULT_ACCEPTED);
        assert_eq!(vehicle.reboot_requested, Some(true));

        let shutdown = command(
            MavCmd::MAV_CMD_PREFLIGHT_REBOOT_SHUTDOWN,
            [2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        );
        assert_eq!(run(&PLANE, &mut vehicle, &shutdown).0, MavResult::MAV_RESULT_UNSUPPORTED);
    }
}
