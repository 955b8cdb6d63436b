//! Logical Telemetry Messages
//!
//! [`MessageId`] names everything the dispatcher can be asked to send. Each
//! id maps to the wire frames its send action emits, and therefore to the
//! worst-case number of transmit-buffer bytes that must be free before the
//! action may run.

/// MAVLink v2 header (10) plus checksum (2), unsigned
pub const MAVLINK_NUM_NON_PAYLOAD_BYTES: usize = 12;

/// Largest possible MAVLink v2 frame, signature included
pub const MAVLINK_MAX_FRAME_BYTES: usize = 280;

/// Wire message ids (`MAVLINK_MSG_ID_*`) used by the send actions
pub mod wire {
    pub const HEARTBEAT: u32 = 0;
    pub const SYS_STATUS: u32 = 1;
    pub const SYSTEM_TIME: u32 = 2;
    pub const PARAM_VALUE: u32 = 22;
    pub const GPS_RAW_INT: u32 = 24;
    pub const RAW_IMU: u32 = 27;
    pub const SCALED_PRESSURE: u32 = 29;
    pub const ATTITUDE: u32 = 30;
    pub const LOCAL_POSITION_NED: u32 = 32;
    pub const GLOBAL_POSITION_INT: u32 = 33;
    pub const RC_CHANNELS_SCALED: u32 = 34;
    pub const RC_CHANNELS_RAW: u32 = 35;
    pub const SERVO_OUTPUT_RAW: u32 = 36;
    pub const MISSION_ITEM: u32 = 39;
    pub const MISSION_REQUEST: u32 = 40;
    pub const MISSION_CURRENT: u32 = 42;
    pub const MISSION_COUNT: u32 = 44;
    pub const MISSION_ITEM_REACHED: u32 = 46;
    pub const MISSION_ACK: u32 = 47;
    pub const NAV_CONTROLLER_OUTPUT: u32 = 62;
    pub const MISSION_ITEM_INT: u32 = 73;
    pub const VFR_HUD: u32 = 74;
    pub const COMMAND_ACK: u32 = 77;
    pub const OPTICAL_FLOW: u32 = 100;
    pub const LOG_ENTRY: u32 = 118;
    pub const LOG_DATA: u32 = 120;
    pub const POWER_STATUS: u32 = 125;
    pub const TERRAIN_REQUEST: u32 = 133;
    pub const AUTOPILOT_VERSION: u32 = 148;
    pub const SENSOR_OFFSETS: u32 = 150;
    pub const MEMINFO: u32 = 152;
    pub const MOUNT_STATUS: u32 = 158;
    pub const FENCE_POINT: u32 = 160;
    pub const FENCE_STATUS: u32 = 162;
    pub const AHRS: u32 = 163;
    pub const SIMSTATE: u32 = 164;
    pub const HWSTATUS: u32 = 165;
    pub const WIND: u32 = 168;
    pub const RANGEFINDER: u32 = 173;
    pub const RALLY_POINT: u32 = 175;
    pub const AHRS2: u32 = 178;
    pub const CAMERA_FEEDBACK: u32 = 180;
    pub const BATTERY2: u32 = 181;
    pub const MAG_CAL_PROGRESS: u32 = 191;
    pub const MAG_CAL_REPORT: u32 = 192;
    pub const EKF_STATUS_REPORT: u32 = 193;
    pub const PID_TUNING: u32 = 194;
    pub const GIMBAL_REPORT: u32 = 200;
    pub const RPM: u32 = 226;
    pub const VIBRATION: u32 = 241;
    pub const HOME_POSITION: u32 = 242;
    pub const STATUSTEXT: u32 = 253;
    pub const PROTOCOL_VERSION: u32 = 300;
}

/// Maximum payload length (extensions included) of a wire message
pub const fn payload_len(msg_id: u32) -> Option<usize> {
    let len = match msg_id {
        wire::HEARTBEAT => 9,
        wire::SYS_STATUS => 43,
        wire::SYSTEM_TIME => 12,
        wire::PARAM_VALUE => 25,
        wire::GPS_RAW_INT => 52,
        wire::RAW_IMU => 29,
        wire::SCALED_PRESSURE => 16,
        wire::ATTITUDE => 28,
        wire::LOCAL_POSITION_NED => 28,
        wire::GLOBAL_POSITION_INT => 28,
        wire::RC_CHANNELS_SCALED => 22,
        wire::RC_CHANNELS_RAW => 22,
        wire::SERVO_OUTPUT_RAW => 37,
        wire::MISSION_ITEM => 38,
        wire::MISSION_REQUEST => 5,
        wire::MISSION_CURRENT => 18,
        wire::MISSION_COUNT => 9,
        wire::MISSION_ITEM_REACHED => 2,
        wire::MISSION_ACK => 8,
        wire::NAV_CONTROLLER_OUTPUT => 26,
        wire::MISSION_ITEM_INT => 38,
        wire::VFR_HUD => 20,
        wire::COMMAND_ACK => 10,
        wire::OPTICAL_FLOW => 34,
        wire::LOG_ENTRY => 14,
        wire::LOG_DATA => 97,
        wire::POWER_STATUS => 6,
        wire::TERRAIN_REQUEST => 18,
        wire::AUTOPILOT_VERSION => 78,
        wire::SENSOR_OFFSETS => 42,
        wire::MEMINFO => 6,
        wire::MOUNT_STATUS => 15,
        wire::FENCE_POINT => 12,
        wire::FENCE_STATUS => 9,
        wire::AHRS => 28,
        wire::SIMSTATE => 44,
        wire::HWSTATUS => 3,
        wire::WIND => 12,
        wire::RANGEFINDER => 8,
        wire::RALLY_POINT => 19,
        wire::AHRS2 => 24,
        wire::CAMERA_FEEDBACK => 47,
        wire::BATTERY2 => 4,
        wire::MAG_CAL_PROGRESS => 27,
        wire::MAG_CAL_REPORT => 54,
        wire::EKF_STATUS_REPORT => 26,
        wire::PID_TUNING => 33,
        wire::GIMBAL_REPORT => 41,
        wire::RPM => 8,
        wire::VIBRATION => 32,
        wire::HOME_POSITION => 60,
        wire::STATUSTEXT => 54,
        wire::PROTOCOL_VERSION => 22,
        _ => return None,
    };
    Some(len)
}

/// Worst-case encoded size of one frame. Unknown ids assume the largest
/// possible frame.
pub const fn frame_len(msg_id: u32) -> usize {
    match payload_len(msg_id) {
        Some(len) => len + MAVLINK_NUM_NON_PAYLOAD_BYTES,
        None => MAVLINK_MAX_FRAME_BYTES,
    }
}

/// Logical message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    Heartbeat,
    Attitude,
    Location,
    LocalPosition,
    ExtendedStatus1,
    ExtendedStatus2,
    NavControllerOutput,
    CurrentWaypoint,
    VfrHud,
    ServoOut,
    RadioIn,
    RadioOut,
    RawImu1,
    RawImu2,
    RawImu3,
    GpsRaw,
    SystemTime,
    NextParam,
    NextWaypoint,
    StatusText,
    LimitsStatus,
    FenceStatus,
    Ahrs,
    SimState,
    HwStatus,
    Wind,
    Rangefinder,
    Terrain,
    Battery2,
    CameraFeedback,
    MountStatus,
    OpticalFlow,
    GimbalReport,
    EkfStatusReport,
    PidTuning,
    Vibration,
    Rpm,
    MissionItemReached,
    MagCalProgress,
    MagCalReport,
    RetryDeferred,
}

/// Frames one send action may emit, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSpec {
    pub frames: &'static [u32],
}

impl MessageSpec {
    /// Transmit-buffer bytes the action needs in the worst case
    pub const fn max_bytes(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.frames.len() {
            total += frame_len(self.frames[i]);
            i += 1;
        }
        total
    }

    /// Recognised identifiers with nothing to send
    pub const fn is_placeholder(&self) -> bool {
        self.frames.is_empty()
    }
}

impl MessageId {
    /// Every identifier, in declaration order
    pub const ALL: [MessageId; 41] = [
        MessageId::Heartbeat,
        MessageId::Attitude,
        MessageId::Location,
        MessageId::LocalPosition,
        MessageId::ExtendedStatus1,
        MessageId::ExtendedStatus2,
        MessageId::NavControllerOutput,
        MessageId::CurrentWaypoint,
        MessageId::VfrHud,
        MessageId::ServoOut,
        MessageId::RadioIn,
        MessageId::RadioOut,
        MessageId::RawImu1,
        MessageId::RawImu2,
        MessageId::RawImu3,
        MessageId::GpsRaw,
        MessageId::SystemTime,
        MessageId::NextParam,
        MessageId::NextWaypoint,
        MessageId::StatusText,
        MessageId::LimitsStatus,
        MessageId::FenceStatus,
        MessageId::Ahrs,
        MessageId::SimState,
        MessageId::HwStatus,
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
        MessageId::MagCalProgress,
        MessageId::MagCalReport,
        MessageId::RetryDeferred,
    ];

    /// Wire frames emitted for this id
    pub const fn spec(self) -> MessageSpec {
        use wire::*;
        let frames: &'static [u32] = match self {
            MessageId::Heartbeat => &[HEARTBEAT],
            MessageId::Attitude => &[ATTITUDE],
            MessageId::Location => &[GLOBAL_POSITION_INT],
            MessageId::LocalPosition => &[LOCAL_POSITION_NED],
            MessageId::ExtendedStatus1 => &[SYS_STATUS, POWER_STATUS],
            MessageId::ExtendedStatus2 => &[MEMINFO],
            MessageId::NavControllerOutput => &[NAV_CONTROLLER_OUTPUT],
            MessageId::CurrentWaypoint => &[MISSION_CURRENT],
            MessageId::VfrHud => &[VFR_HUD],
            MessageId::ServoOut => &[RC_CHANNELS_SCALED],
            MessageId::RadioIn => &[RC_CHANNELS_RAW],
            MessageId::RadioOut => &[SERVO_OUTPUT_RAW],
            MessageId::RawImu1 => &[RAW_IMU],
            MessageId::RawImu2 => &[SCALED_PRESSURE],
            MessageId::RawImu3 => &[SENSOR_OFFSETS],
            MessageId::GpsRaw => &[GPS_RAW_INT],
            MessageId::SystemTime => &[SYSTEM_TIME],
            MessageId::NextParam => &[PARAM_VALUE],
            MessageId::NextWaypoint => &[MISSION_REQUEST],
            MessageId::StatusText => &[STATUSTEXT],
            MessageId::LimitsStatus => &[],
            MessageId::FenceStatus => &[FENCE_STATUS],
            MessageId::Ahrs => &[AHRS],
            MessageId::SimState => &[SIMSTATE, AHRS2],
            MessageId::HwStatus => &[HWSTATUS],
            MessageId::Wind => &[WIND],
            MessageId::Rangefinder => &[RANGEFINDER],
            MessageId::Terrain => &[TERRAIN_REQUEST],
            MessageId::Battery2 => &[BATTERY2],
            MessageId::CameraFeedback => &[CAMERA_FEEDBACK],
            MessageId::MountStatus => &[MOUNT_STATUS],
            MessageId::OpticalFlow => &[OPTICAL_FLOW],
            MessageId::GimbalReport => &[GIMBAL_REPORT],
            MessageId::EkfStatusReport => &[EKF_STATUS_REPORT],
            MessageId::PidTuning => &[PID_TUNING],
            MessageId::Vibration => &[VIBRATION],
            MessageId::Rpm => &[RPM],
            MessageId::MissionItemReached => &[MISSION_ITEM_REACHED],
            MessageId::MagCalProgress => &[MAG_CAL_PROGRESS],
            MessageId::MagCalReport => &[MAG_CAL_REPORT],
            MessageId::RetryDeferred => &[],
        };
        MessageSpec { frames }
    }
}
