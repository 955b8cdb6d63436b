//! MAVLink Parameter Protocol Handler
//!
//! Implements parameter read/write protocol for Ground Control Stations.
//!
//! # Supported Messages
//!
//! - **PARAM_REQUEST_LIST**: Start streaming every parameter
//! - **PARAM_REQUEST_READ**: Send one parameter by index or name
//! - **PARAM_SET**: Update a parameter and echo the stored value
//!
//! The full list is not sent in one burst. A request only positions the
//! channel's [`ParamStream`] cursor; the scheduler's PARAMS stream then emits
//! a few PARAM_VALUE frames per trigger, sized to the free transmit space.
//!
//! The `SRn_*` stream-rate parameters live in the channel's own
//! [`StreamRates`] table rather than the vehicle store. They are answered
//! with index 65535 because they are not part of the enumerated list.

use mavlink::ardupilotmega::{
    MavMessage, MavParamType, MavSeverity, PARAM_REQUEST_LIST_DATA, PARAM_REQUEST_READ_DATA,
    PARAM_SET_DATA, PARAM_VALUE_DATA,
};
use pico_trail_gcs_core::StreamRates;

use super::{name_from_bytes, name_to_bytes, HandlerContext};
use crate::communication::mavlink::status_notifier::format_line;
use crate::communication::mavlink::vehicle::{ParamEntry, ParameterStore};

/// Index reported for parameters outside the enumerated list
pub const UNLISTED_PARAM_INDEX: u16 = u16::MAX;

/// Parameter download cursor of one channel
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParamStream {
    next_index: Option<u16>,
}

impl ParamStream {
    pub const fn new() -> Self {
        Self { next_index: None }
    }

    /// Restart the download from the first parameter
    pub fn start(&mut self) {
        self.next_index = Some(0);
    }

    pub fn stop(&mut self) {
        self.next_index = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_index.is_some()
    }

    /// Next parameter to send. The cursor moves on and the stream stops
    /// after the last parameter.
    pub fn next_entry<P: ParameterStore + ?Sized>(&mut self, store: &P) -> Option<(u16, ParamEntry)> {
        let count = store.param_count();
        while let Some(index) = self.next_index {
            if index >= count {
                self.next_index = None;
                return None;
            }
            self.next_index = index.checked_add(1).filter(|next| *next < count);
            if let Some(entry) = store.param(index) {
                return Some((index, entry));
            }
        }
        None
    }
}

/// PARAM_VALUE for `entry`
pub fn param_value_message(entry: &ParamEntry, index: u16, count: u16) -> MavMessage {
    MavMessage::PARAM_VALUE(PARAM_VALUE_DATA {
        param_value: entry.value,
        param_count: count,
        param_index: index,
        param_id: name_to_bytes(entry.name.as_str()),
        param_type: entry.param_type,
    })
}

fn rate_value_message(name: &str, value: f32, count: u16) -> MavMessage {
    MavMessage::PARAM_VALUE(PARAM_VALUE_DATA {
        param_value: value,
        param_count: count,
        param_index: UNLISTED_PARAM_INDEX,
        param_id: name_to_bytes(name),
        param_type: MavParamType::MAV_PARAM_TYPE_INT16,
    })
}

/// PARAM_REQUEST_LIST
pub fn handle_request_list(
    ctx: &mut HandlerContext<'_>,
    stream: &mut ParamStream,
    _data: &PARAM_REQUEST_LIST_DATA,
) {
    crate::log_info!("Parameter download requested");
    let firmware = ctx.config.firmware_string;
    ctx.send_text(MavSeverity::MAV_SEVERITY_INFO, firmware);
    stream.start();
}

/// PARAM_REQUEST_READ
pub fn handle_request_read(
    ctx: &mut HandlerContext<'_>,
    rates: &StreamRates,
    data: &PARAM_REQUEST_READ_DATA,
) {
    let count = ctx.vehicle.param_count();

    let index = if data.param_index >= 0 {
        data.param_index as u16
    } else {
        let Some(name) = name_from_bytes(&data.param_id) else {
            crate::log_warn!("PARAM_REQUEST_READ with unreadable name");
            return;
        };
        if let Some(value) = rates.get_param(name) {
            ctx.reply(rate_value_message(name, value, count));
            return;
        }
        match ctx.vehicle.find_param(name) {
            Some(index) => index,
            None => {
                crate::log_warn!("Parameter not found: {}", name);
                return;
            }
        }
    };

    match ctx.vehicle.param(index) {
        Some(entry) => ctx.reply(param_value_message(&entry, index, count)),
        None => crate::log_warn!("Parameter index {} not found", index),
    }
}

/// PARAM_SET
pub fn handle_set(ctx: &mut HandlerContext<'_>, rates: &mut StreamRates, data: &PARAM_SET_DATA) {
    let Some(name) = name_from_bytes(&data.param_id) else {
        crate::log_warn!("PARAM_SET with unreadable name");
        return;
    };
    let count = ctx.vehicle.param_count();

    if rates.stream_for_param(name).is_some() {
        if rates.set_param(name, data.param_value).is_err() {
            crate::log_warn!("{} rejected value {}", name, data.param_value);
        }
        let value = rates.get_param(name).unwrap_or_default();
        ctx.reply(rate_value_message(name, value, count));
        return;
    }

    let Some(index) = ctx.vehicle.find_param(name) else {
        let text = format_line(format_args!("Unknown parameter {}", name));
        ctx.send_text(MavSeverity::MAV_SEVERITY_WARNING, text.as_str());
        return;
    };

    // Echo whatever is stored, so a refused write shows the old value
    let index = match ctx.vehicle.set_param(name, data.param_value) {
        Ok(index) => index,
        Err(_e) => {
            crate::log_warn!("Failed to set {}: {}", name, _e);
            index
        }
    };
    if let Some(entry) = ctx.vehicle.param(index) {
        ctx.reply(param_value_message(&entry, index, count));
    }
}
