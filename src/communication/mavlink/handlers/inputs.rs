//! Link-level and pass-through inputs
//!
//! Everything inbound that is neither a command, a mission item nor a
//! parameter: GCS liveness, stream-rate requests, radio link quality, RC
//! overrides, home and mode changes, log transfer control and messages
//! forwarded untouched to other subsystems.

use mavlink::ardupilotmega::{
    MavCmd, MavMessage, MavResult, COMMAND_ACK_DATA, HEARTBEAT_DATA, RC_CHANNELS_OVERRIDE_DATA,
    REQUEST_DATA_STREAM_DATA, SET_HOME_POSITION_DATA, SET_MODE_DATA,
};
use pico_trail_gcs_core::stream::DATA_STREAM_ALL;
use pico_trail_gcs_core::{Location, StreamId, StreamRates, StreamTrigger};

use super::HandlerContext;
use crate::communication::mavlink::channel::ChannelEvent;
use crate::communication::mavlink::vehicle::InboundFeatures;

/// Stream slowdown ceiling while the radio buffer is filling
const SLOWDOWN_MAX: u16 = 100;

/// Slowdown the radio buffer must have before easing off by two
const SLOWDOWN_FAST_RECOVERY: u16 = 10;

/// Radio link quality as last reported by the telemetry radio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioLinkStats {
    /// Free transmit buffer on the radio, percent
    pub txbuf: u8,
    /// Remote RSSI
    pub remrssi: u8,
    pub last_status_ms: u32,
    /// Last report carrying a remote RSSI
    pub last_remrssi_ms: u32,
}

/// Radio transmit-buffer fill level as reported by RADIO / RADIO_STATUS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioReport {
    pub txbuf: u8,
    pub remrssi: u8,
}

/// HEARTBEAT: keep the GCS failsafe fed
pub fn handle_heartbeat(ctx: &mut HandlerContext<'_>, _data: &HEARTBEAT_DATA) {
    if !ctx.profile.features.contains(InboundFeatures::GCS_FAILSAFE) {
        return;
    }
    if ctx.source.system_id != ctx.config.gcs_system_id {
        return;
    }
    let now = ctx.vehicle.now_ms();
    ctx.vehicle.gcs_heartbeat(now);
}

/// REQUEST_DATA_STREAM: start (1) or stop (0) one stream or all of them
pub fn handle_request_data_stream(
    rates: &mut StreamRates,
    data: &REQUEST_DATA_STREAM_DATA,
) {
    let hz = match data.start_stop {
        0 => 0.0,
        1 => data.req_message_rate as f32,
        _ => return,
    };

    if data.req_stream_id == DATA_STREAM_ALL {
        rates.set_all_telemetry(hz);
        crate::log_info!("All telemetry streams set to {} Hz", hz);
        return;
    }

    match StreamId::from_data_stream(data.req_stream_id) {
        Some(stream) => {
            rates.set_rate_hz(stream, hz);
            crate::log_info!("Stream {} set to {} Hz", stream.param_suffix(), hz);
        }
        None => crate::log_warn!("Unknown data stream {}", data.req_stream_id),
    }
}

/// RADIO / RADIO_STATUS: adapt the global stream slowdown to the radio's
/// buffer level
pub fn handle_radio_status(
    ctx: &mut HandlerContext<'_>,
    trigger: &mut StreamTrigger,
    stats: &mut RadioLinkStats,
    report: RadioReport,
) {
    let now = ctx.vehicle.now_ms();
    stats.txbuf = report.txbuf;
    stats.last_status_ms = now;
    if report.remrssi != 0 {
        stats.remrssi = report.remrssi;
        stats.last_remrssi_ms = now;
    }

    let slowdown = trigger.slowdown();
    let adjusted = if report.txbuf < 20 && slowdown < SLOWDOWN_MAX {
        slowdown + 3
    } else if report.txbuf < 50 && slowdown < SLOWDOWN_MAX {
        slowdown + 1
    } else if report.txbuf > 95 && slowdown > SLOWDOWN_FAST_RECOVERY {
        slowdown - 2
    } else if report.txbuf > 90 && slowdown != 0 {
        slowdown - 1
    } else {
        slowdown
    };
    if adjusted != slowdown {
        crate::log_debug!("Stream slowdown {} -> {}", slowdown, adjusted);
        trigger.set_slowdown(adjusted);
    }
}

/// RC_CHANNELS_OVERRIDE from the controlling GCS
pub fn handle_rc_override(ctx: &mut HandlerContext<'_>, data: &RC_CHANNELS_OVERRIDE_DATA) {
    if !ctx.profile.features.contains(InboundFeatures::RC_OVERRIDE) {
        return;
    }
    if ctx.source.system_id != ctx.config.gcs_system_id {
        return;
    }

    let channels = [
        data.chan1_raw,
        data.chan2_raw,
        data.chan3_raw,
        data.chan4_raw,
        data.chan5_raw,
        data.chan6_raw,
        data.chan7_raw,
        data.chan8_raw,
    ];
    if !ctx.vehicle.set_rc_overrides(&channels) {
        crate::log_debug!("RC override not applied");
    }
    // An override counts as a sign of life from the GCS
    let now = ctx.vehicle.now_ms();
    ctx.vehicle.gcs_heartbeat(now);
}

/// SET_HOME_POSITION: new home, announced on every channel
pub fn handle_set_home_position(ctx: &mut HandlerContext<'_>, data: &SET_HOME_POSITION_DATA) {
    if !ctx.profile.features.contains(InboundFeatures::SET_HOME_POSITION) {
        return;
    }
    let home = match Location::home_from_scaled(data.latitude, data.longitude, data.altitude) {
        Ok(home) => home,
        Err(_) => {
            crate::log_warn!("SET_HOME_POSITION ignored: invalid location");
            return;
        }
    };
    if ctx.vehicle.set_home(home) {
        ctx.raise(ChannelEvent::HomeChanged(home));
    }
}

/// SET_MODE: custom mode change, acknowledged like DO_SET_MODE
pub fn handle_set_mode(ctx: &mut HandlerContext<'_>, data: &SET_MODE_DATA) {
    let result = if ctx.vehicle.set_custom_mode(data.custom_mode) {
        MavResult::MAV_RESULT_ACCEPTED
    } else {
        MavResult::MAV_RESULT_FAILED
    };
    ctx.reply(MavMessage::COMMAND_ACK(COMMAND_ACK_DATA {
        command: MavCmd::MAV_CMD_DO_SET_MODE,
        result,
        progress: 0,
        result_param2: 0,
        target_system: ctx.source.system_id,
        target_component: ctx.source.component_id,
    }));
}

/// LOG_REQUEST_LIST / LOG_REQUEST_DATA / LOG_ERASE / LOG_REQUEST_END
pub fn handle_log_message(
    ctx: &mut HandlerContext<'_>,
    in_log_download: &mut bool,
    message: &MavMessage,
) {
    match message {
        MavMessage::LOG_REQUEST_DATA(_) | MavMessage::LOG_ERASE(_) => *in_log_download = true,
        MavMessage::LOG_REQUEST_END(_) => *in_log_download = false,
        _ => {}
    }
    if !ctx.vehicle.in_mavlink_delay() {
        ctx.vehicle.handle_log_request(message, *in_log_download);
    }
}
