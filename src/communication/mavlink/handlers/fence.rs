//! Geofence and rally point transfer
//!
//! FENCE_POINT / RALLY_POINT uploads are one message per point, without
//! acknowledgement; problems are reported as warning status texts. Fetch
//! requests are answered with the stored point.

use mavlink::ardupilotmega::{
    MavMessage, MavSeverity, FENCE_FETCH_POINT_DATA, FENCE_POINT_DATA, RALLY_FETCH_POINT_DATA,
    RALLY_POINT_DATA,
};

use super::HandlerContext;
use crate::communication::mavlink::vehicle::RallyPoint;

fn warn(ctx: &mut HandlerContext<'_>, text: &str) {
    ctx.send_text(MavSeverity::MAV_SEVERITY_WARNING, text);
}

/// FENCE_POINT: store one boundary point (fence must be inactive)
pub fn handle_fence_point(ctx: &mut HandlerContext<'_>, data: &FENCE_POINT_DATA) {
    let total = ctx.vehicle.fence_total();
    if !ctx.vehicle.fence_action_is_none() {
        warn(ctx, "Fencing must be disabled");
    } else if data.count != total || data.idx >= total {
        warn(ctx, "Bad fence point");
    } else if libm::fabsf(data.lat) > 90.0 || libm::fabsf(data.lng) > 180.0 {
        warn(ctx, "Invalid fence point, lat or lng too large");
    } else {
        let lat = (data.lat as f64 * 1.0e7) as i32;
        let lng = (data.lng as f64 * 1.0e7) as i32;
        if !ctx.vehicle.set_fence_point(data.idx, lat, lng) {
            crate::log_warn!("Fence point {} not stored", data.idx);
        }
    }
}

/// FENCE_FETCH_POINT
pub fn handle_fence_fetch(ctx: &mut HandlerContext<'_>, data: &FENCE_FETCH_POINT_DATA) {
    let total = ctx.vehicle.fence_total();
    if data.idx >= total {
        warn(ctx, "Bad fence point");
        return;
    }
    let Some((lat, lng)) = ctx.vehicle.fence_point(data.idx) else {
        warn(ctx, "Bad fence point");
        return;
    };
    ctx.reply(MavMessage::FENCE_POINT(FENCE_POINT_DATA {
        lat: lat as f32 * 1.0e-7,
        lng: lng as f32 * 1.0e-7,
        target_system: ctx.source.system_id,
        target_component: ctx.source.component_id,
        idx: data.idx,
        count: total,
    }));
}

/// RALLY_POINT: store one rally point
pub fn handle_rally_point(ctx: &mut HandlerContext<'_>, data: &RALLY_POINT_DATA) {
    let total = ctx.vehicle.rally_total();
    if data.idx >= total || data.idx >= ctx.vehicle.rally_max() {
        warn(ctx, "Bad rally point message ID");
        return;
    }
    if data.count != total {
        warn(ctx, "Bad rally point message count");
        return;
    }

    let point = RallyPoint {
        lat: data.lat,
        lng: data.lng,
        alt: data.alt,
        break_alt: data.break_alt,
        land_dir: data.land_dir,
        flags: data.flags,
    };
    if !ctx.vehicle.set_rally_point(data.idx, point) {
        crate::log_warn!("Rally point {} not stored", data.idx);
    }
}

/// RALLY_FETCH_POINT
pub fn handle_rally_fetch(ctx: &mut HandlerContext<'_>, data: &RALLY_FETCH_POINT_DATA) {
    let total = ctx.vehicle.rally_total();
    if data.idx >= total {
        warn(ctx, "Bad rally point index");
        return;
    }
    let Some(point) = ctx.vehicle.rally_point(data.idx) else {
        warn(ctx, "Failed to set rally point");
        return;
    };
    ctx.reply(MavMessage::RALLY_POINT(RALLY_POINT_DATA {
        lat: point.lat,
        lng: point.lng,
        alt: point.alt,
        break_alt: point.break_alt,
        land_dir: point.land_dir,
        target_system: ctx.source.system_id,
        target_component: ctx.source.component_id,
        idx: data.idx,
        count: total,
        flags: point.flags,
    }));
}
