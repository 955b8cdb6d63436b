//! Mission Protocol Handler
//!
//! Mission upload sessions, partial-list writes and item download for
//! vehicles with a full flight plan; a single home item for home-only
//! vehicles, which never answer download requests.
//!
//! # Mission Upload Flow (GCS → Autopilot)
//!
//! 1. GCS sends MISSION_COUNT (or MISSION_WRITE_PARTIAL_LIST for a range)
//! 2. The channel opens an [`UploadSession`] and requests the first item
//!    through the NEXT_WAYPOINT send action
//! 3. GCS sends MISSION_ITEM / MISSION_ITEM_INT for the requested seq
//! 4. ... repeat until the last item is stored
//! 5. Autopilot sends MISSION_ACK(ACCEPTED) to the peer that opened the session
//!
//! Any rejected item closes the session and is acknowledged with the
//! reason. Silence is handled by the channel's session poll, which re-requests
//! the item and finally cancels the upload.
//!
//! # Mission Download Flow (Autopilot → GCS)
//!
//! 1. GCS sends MISSION_REQUEST_LIST
//! 2. Autopilot responds with MISSION_COUNT
//! 3. GCS sends MISSION_REQUEST / MISSION_REQUEST_INT per item
//! 4. Autopilot responds with the matching item message
//!
//! # Home-only Variant
//!
//! Vehicles with [`MissionProtocol::HomeOnly`] accept a single item 0 via
//! MISSION_WRITE_PARTIAL_LIST, store it as home and close the session at once.
//! Partial lists starting anywhere but 0 are ignored, and the channel does
//! not route MISSION_REQUEST_LIST, MISSION_REQUEST or MISSION_COUNT to them.
//!
//! Items whose local-frame offset from home cannot be represented are
//! refused with MAV_MISSION_INVALID_PARAM.

use mavlink::ardupilotmega::{
    MavCmd, MavFrame, MavMessage, MavMissionResult, MavMissionType, MavSeverity,
    MISSION_ACK_DATA, MISSION_CLEAR_ALL_DATA, MISSION_COUNT_DATA, MISSION_CURRENT_DATA,
    MISSION_ITEM_DATA, MISSION_ITEM_INT_DATA, MISSION_ITEM_REACHED_DATA,
    MISSION_REQUEST_DATA, MISSION_REQUEST_LIST_DATA, MISSION_SET_CURRENT_DATA,
    MISSION_WRITE_PARTIAL_LIST_DATA,
};
use pico_trail_gcs_core::command::MAV_CMD_DO_JUMP;
use pico_trail_gcs_core::session::UploadState;
use pico_trail_gcs_core::{
    Location, MessageId, MissionFrame, Peer, UploadError, UploadProgress, UploadSession,
};

use super::HandlerContext;
use crate::communication::mavlink::vehicle::{MissionItem, MissionProtocol, MissionStoreError};

/// MISSION_ITEM coordinates as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq)]
enum Coords {
    /// Degrees (metres for local frames)
    Degrees { x: f32, y: f32, z: f32 },
    /// 1e-7 degrees (metres * 1e4 for local frames)
    Scaled { x: i32, y: i32, z: f32 },
}

/// MISSION_ITEM or MISSION_ITEM_INT, normalised
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InboundItem {
    pub seq: u16,
    /// Raw `MAV_FRAME`
    pub frame: u8,
    pub command: MavCmd,
    /// 2: guided target, 3: altitude change, otherwise a stored item
    pub current: u8,
    pub autocontinue: u8,
    pub params: [f32; 4],
    coords: Coords,
}

impl From<&MISSION_ITEM_DATA> for InboundItem {
    fn from(data: &MISSION_ITEM_DATA) -> Self {
        Self {
            seq: data.seq,
            frame: data.frame as u8,
            command: data.command,
            current: data.current,
            autocontinue: data.autocontinue,
            params: [data.param1, data.param2, data.param3, data.param4],
            coords: Coords::Degrees {
                x: data.x,
                y: data.y,
                z: data.z,
            },
        }
    }
}

impl From<&MISSION_ITEM_INT_DATA> for InboundItem {
    fn from(data: &MISSION_ITEM_INT_DATA) -> Self {
        Self {
            seq: data.seq,
            frame: data.frame as u8,
            command: data.command,
            current: data.current,
            autocontinue: data.autocontinue,
            params: [data.param1, data.param2, data.param3, data.param4],
            coords: Coords::Scaled {
                x: data.x,
                y: data.y,
                z: data.z,
            },
        }
    }
}

impl InboundItem {
    fn to_mission_item(self, frame: MissionFrame, home: &Location) -> Option<MissionItem> {
        let location = match self.coords {
            Coords::Degrees { x, y, z } => frame.to_location(x, y, z, home)?,
            Coords::Scaled { x, y, z } => frame.to_location_int(x, y, z, home)?,
        };
        Some(MissionItem {
            seq: self.seq,
            command: self.command,
            location,
            params: self.params,
            autocontinue: self.autocontinue != 0,
        })
    }
}

/// MISSION_ACK addressed to `peer`
pub fn mission_ack_message(peer: Peer, result: MavMissionResult) -> MavMessage {
    MavMessage::MISSION_ACK(MISSION_ACK_DATA {
        target_system: peer.system_id,
        target_component: peer.component_id,
        mavtype: result,
        mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        opaque_id: 0,
    })
}

/// MISSION_REQUEST for the item the upload session is waiting for
pub fn next_waypoint_request(upload: &UploadSession) -> Option<MavMessage> {
    let (seq, peer) = upload.pending_request()?;
    Some(MavMessage::MISSION_REQUEST(MISSION_REQUEST_DATA {
        seq,
        target_system: peer.system_id,
        target_component: peer.component_id,
        mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
    }))
}

pub fn mission_item_reached_message(seq: u16) -> MavMessage {
    MavMessage::MISSION_ITEM_REACHED(MISSION_ITEM_REACHED_DATA { seq })
}

fn ack(ctx: &mut HandlerContext<'_>, peer: Peer, result: MavMissionResult) {
    ctx.reply(mission_ack_message(peer, result));
}

/// Close the session and tell the sender why its item was refused
fn reject(ctx: &mut HandlerContext<'_>, upload: &mut UploadSession, result: MavMissionResult) {
    upload.abort();
    crate::log_warn!("Mission item rejected: result {}", result as u32);
    let source = ctx.source;
    ack(ctx, source, result);
}

fn upload_total(upload: &UploadSession) -> u16 {
    match upload.state() {
        UploadState::Receiving { last_seq, .. } => last_seq.saturating_add(1),
        UploadState::Idle => 0,
    }
}

/// Frame a stored location is reported in
fn download_frame(location: &Location) -> MavFrame {
    if location.is_terrain_alt() {
        MavFrame::MAV_FRAME_GLOBAL_TERRAIN_ALT
    } else if location.is_relative_alt() {
        MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT
    } else {
        MavFrame::MAV_FRAME_GLOBAL
    }
}

/// MISSION_REQUEST_LIST: report the stored count and drop any upload
pub fn handle_request_list(
    ctx: &mut HandlerContext<'_>,
    upload: &mut UploadSession,
    _data: &MISSION_REQUEST_LIST_DATA,
) {
    crate::log_info!("Mission download requested");
    upload.abort();
    let count = ctx.vehicle.mission_count();
    ctx.reply(MavMessage::MISSION_COUNT(MISSION_COUNT_DATA {
        count,
        target_system: ctx.source.system_id,
        target_component: ctx.source.component_id,
        mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        opaque_id: 0,
    }));
}

/// MISSION_REQUEST / MISSION_REQUEST_INT: send one stored item
pub fn handle_request(ctx: &mut HandlerContext<'_>, seq: u16, int: bool) {
    let source = ctx.source;
    if seq >= ctx.vehicle.mission_count() {
        ack(ctx, source, MavMissionResult::MAV_MISSION_INVALID_SEQUENCE);
        return;
    }
    let Some(item) = ctx.vehicle.mission_item(seq) else {
        ack(ctx, source, MavMissionResult::MAV_MISSION_ERROR);
        return;
    };

    let current = u8::from(ctx.vehicle.current_mission_item() == seq);
    let frame = download_frame(&item.location);
    let [param1, param2, param3, param4] = item.params;
    let z = item.location.alt_cm as f32 / 100.0;

    let message = if int {
        MavMessage::MISSION_ITEM_INT(MISSION_ITEM_INT_DATA {
            param1,
            param2,
            param3,
            param4,
            x: item.location.lat,
            y: item.location.lng,
            z,
            seq,
            command: item.command,
            target_system: source.system_id,
            target_component: source.component_id,
            frame,
            current,
            autocontinue: u8::from(item.autocontinue),
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        })
    } else {
        MavMessage::MISSION_ITEM(MISSION_ITEM_DATA {
            param1,
            param2,
            param3,
            param4,
            x: item.location.lat as f32 / 1.0e7,
            y: item.location.lng as f32 / 1.0e7,
            z,
            seq,
            command: item.command,
            target_system: source.system_id,
            target_component: source.component_id,
            frame,
            current,
            autocontinue: u8::from(item.autocontinue),
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        })
    };
    ctx.reply(message);
}

/// MISSION_COUNT: start a whole-mission upload
pub fn handle_count(
    ctx: &mut HandlerContext<'_>,
    upload: &mut UploadSession,
    data: &MISSION_COUNT_DATA,
) {
    let source = ctx.source;
    upload.abort();

    if data.count > ctx.vehicle.mission_capacity() {
        crate::log_warn!("Mission upload of {} items does not fit", data.count);
        ack(ctx, source, MavMissionResult::MAV_MISSION_NO_SPACE);
        return;
    }

    ctx.vehicle.truncate_mission(data.count);
    if data.count == 0 {
        ack(ctx, source, MavMissionResult::MAV_MISSION_ACCEPTED);
        return;
    }

    crate::log_info!("Mission upload started: {} items", data.count);
    upload.begin(0, data.count - 1, source, ctx.vehicle.now_ms());
    ctx.send_message(MessageId::NextWaypoint);
}

/// MISSION_WRITE_PARTIAL_LIST
pub fn handle_write_partial_list(
    ctx: &mut HandlerContext<'_>,
    upload: &mut UploadSession,
    data: &MISSION_WRITE_PARTIAL_LIST_DATA,
) {
    match ctx.profile.mission {
        MissionProtocol::Full => write_partial_list(ctx, upload, data),
        MissionProtocol::HomeOnly => {
            if data.start_index == 0 {
                upload.begin(0, 0, ctx.source, ctx.vehicle.now_ms());
                ctx.send_message(MessageId::NextWaypoint);
            }
        }
    }
}

fn write_partial_list(
    ctx: &mut HandlerContext<'_>,
    upload: &mut UploadSession,
    data: &MISSION_WRITE_PARTIAL_LIST_DATA,
) {
    let count = ctx.vehicle.mission_count() as i32;
    let start = data.start_index as i32;
    let end = data.end_index as i32;

    if start < 0 || end < 0 || start > count || end > count || end < start {
        ctx.send_text(
            MavSeverity::MAV_SEVERITY_WARNING,
            "Flight plan update rejected",
        );
        return;
    }

    upload.begin(start as u16, end as u16, ctx.source, ctx.vehicle.now_ms());
    ctx.send_message(MessageId::NextWaypoint);
}

/// MISSION_ITEM / MISSION_ITEM_INT
pub fn handle_item(ctx: &mut HandlerContext<'_>, upload: &mut UploadSession, item: InboundItem) {
    match ctx.profile.mission {
        MissionProtocol::Full => store_item(ctx, upload, item),
        MissionProtocol::HomeOnly => store_home_item(ctx, upload, item),
    }
}

fn store_item(ctx: &mut HandlerContext<'_>, upload: &mut UploadSession, item: InboundItem) {
    let source = ctx.source;
    let Some(frame) = MissionFrame::from_raw(item.frame) else {
        reject(ctx, upload, MavMissionResult::MAV_MISSION_UNSUPPORTED_FRAME);
        return;
    };
    let home = ctx.vehicle.home().unwrap_or_default();
    let Some(mission_item) = item.to_mission_item(frame, &home) else {
        if matches!(item.current, 2 | 3) {
            ack(ctx, source, MavMissionResult::MAV_MISSION_INVALID_PARAM);
        } else {
            reject(ctx, upload, MavMissionResult::MAV_MISSION_INVALID_PARAM);
        }
        return;
    };

    // Guided targets and altitude changes bypass the upload session
    match item.current {
        2 => {
            let result = if ctx.vehicle.guided_request(&mission_item) {
                MavMissionResult::MAV_MISSION_ACCEPTED
            } else {
                MavMissionResult::MAV_MISSION_ERROR
            };
            ack(ctx, source, result);
            return;
        }
        3 => {
            let result = if ctx.vehicle.change_alt_request(&mission_item) {
                MavMissionResult::MAV_MISSION_ACCEPTED
            } else {
                MavMissionResult::MAV_MISSION_ERROR
            };
            ack(ctx, source, result);
            return;
        }
        _ => {}
    }

    match upload.expect(item.seq) {
        Ok(_) => {}
        Err(UploadError::NotReceiving) => {
            reject(ctx, upload, MavMissionResult::MAV_MISSION_ERROR);
            return;
        }
        Err(UploadError::OutOfSequence {
            expected: _expected,
            received: _received,
        }) => {
            crate::log_warn!("Expected mission item {}, received {}", _expected, _received);
            reject(ctx, upload, MavMissionResult::MAV_MISSION_INVALID_SEQUENCE);
            return;
        }
    }

    if item.command as u16 == MAV_CMD_DO_JUMP {
        let target = item.params[0] as u16;
        let limit = ctx.vehicle.mission_count().max(upload_total(upload));
        if target == 0 || target >= limit {
            reject(ctx, upload, MavMissionResult::MAV_MISSION_ERROR);
            return;
        }
    }

    let count = ctx.vehicle.mission_count();
    let stored = if item.seq < count {
        ctx.vehicle.replace_mission_item(&mission_item)
    } else if item.seq == count {
        ctx.vehicle.append_mission_item(&mission_item)
    } else {
        Err(MissionStoreError::InvalidIndex)
    };
    if let Err(e) = stored {
        crate::log_warn!("Mission item {} not stored: {}", item.seq, e);
        let result = match e {
            MissionStoreError::Full => MavMissionResult::MAV_MISSION_NO_SPACE,
            _ => MavMissionResult::MAV_MISSION_ERROR,
        };
        reject(ctx, upload, result);
        return;
    }

    if item.seq == 0 && !ctx.vehicle.set_home(mission_item.location) {
        crate::log_warn!("Mission item 0 stored but home not updated");
    }

    match upload.advance(ctx.vehicle.now_ms()) {
        Ok(UploadProgress::More { .. }) => ctx.send_message(MessageId::NextWaypoint),
        Ok(UploadProgress::Complete { peer }) => {
            ack(ctx, peer, MavMissionResult::MAV_MISSION_ACCEPTED);
            ctx.send_text(MavSeverity::MAV_SEVERITY_INFO, "Flight plan received");
            ctx.vehicle.mission_upload_complete();
        }
        Err(_) => reject(ctx, upload, MavMissionResult::MAV_MISSION_ERROR),
    }
}

fn store_home_item(ctx: &mut HandlerContext<'_>, upload: &mut UploadSession, item: InboundItem) {
    let Some(frame) = MissionFrame::from_raw(item.frame) else {
        reject(ctx, upload, MavMissionResult::MAV_MISSION_UNSUPPORTED_FRAME);
        return;
    };

    match upload.expect(item.seq) {
        Ok(_) => {}
        Err(UploadError::NotReceiving) => {
            reject(ctx, upload, MavMissionResult::MAV_MISSION_ERROR);
            return;
        }
        Err(UploadError::OutOfSequence { .. }) => {
            reject(ctx, upload, MavMissionResult::MAV_MISSION_INVALID_SEQUENCE);
            return;
        }
    }

    let home = ctx.vehicle.home().unwrap_or_default();
    let Some(location) = item.to_mission_item(frame, &home).map(|m| m.location) else {
        reject(ctx, upload, MavMissionResult::MAV_MISSION_INVALID_PARAM);
        return;
    };
    if !ctx.vehicle.set_home(location) {
        reject(ctx, upload, MavMissionResult::MAV_MISSION_ERROR);
        return;
    }
    ctx.send_text(MavSeverity::MAV_SEVERITY_INFO, "New HOME received");

    let peer = match upload.advance(ctx.vehicle.now_ms()) {
        Ok(UploadProgress::Complete { peer }) => peer,
        _ => {
            // Only item 0 is ever requested
            upload.abort();
            ctx.source
        }
    };
    ack(ctx, peer, MavMissionResult::MAV_MISSION_ACCEPTED);
}

/// MISSION_CLEAR_ALL
pub fn handle_clear_all(ctx: &mut HandlerContext<'_>, _data: &MISSION_CLEAR_ALL_DATA) {
    let result = if ctx.vehicle.clear_mission() {
        MavMissionResult::MAV_MISSION_ACCEPTED
    } else {
        MavMissionResult::MAV_MISSION_ERROR
    };
    let source = ctx.source;
    ack(ctx, source, result);
}

/// MISSION_SET_CURRENT
pub fn handle_set_current(ctx: &mut HandlerContext<'_>, data: &MISSION_SET_CURRENT_DATA) {
    if ctx.vehicle.set_current_mission_item(data.seq) {
        ctx.reply(MavMessage::MISSION_CURRENT(MISSION_CURRENT_DATA {
            seq: data.seq,
            ..Default::default()
        }));
    } else {
        crate::log_warn!("Mission item {} cannot become current", data.seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mavlink::config::GcsConfig;
    use crate::communication::mavlink::mock::MockVehicle;
    use crate::communication::mavlink::status_notifier::StatusNotifier;
    use crate::communication::mavlink::vehicle::{VehicleProfile, PLANE, TRACKER};

    const GCS: Peer = Peer::new(255, 190);

    struct Harness {
        vehicle: MockVehicle,
        upload: UploadSession,
        notifier: StatusNotifier,
        config: GcsConfig,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                vehicle: MockVehicle::new(),
                upload: UploadSession::new(),
                notifier: StatusNotifier::new(),
                config: GcsConfig::default(),
            }
        }

        fn run(
            &mut self,
            profile: &'static VehicleProfile,
            f: impl FnOnce(&mut HandlerContext<'_>, &mut UploadSession),
        ) -> (std::vec::Vec<MavMessage>, std::vec::Vec<MessageId>) {
            let mut ctx = HandlerContext::new(
                &mut self.vehicle,
                profile,
                &self.config,
                &mut self.notifier,
                GCS,
            );
            f(&mut ctx, &mut self.upload);
            let (replies, queued, _) = ctx.finish();
            (
                replies.into_iter().collect(),
                queued.into_iter().collect(),
            )
        }
    }

    fn item(seq: u16, frame: MavFrame, command: MavCmd) -> MISSION_ITEM_DATA {
        MISSION_ITEM_DATA {
            param1: 0.0,
            param2: 0.0,
            param3: 0.0,
            param4: 0.0,
            x: 47.0,
            y: 8.0,
            z: 500.0,
            seq,
            command,
            target_system: 1,
            target_component: 1,
            frame,
            current: 0,
            autocontinue: 1,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        }
    }

    fn count(count: u16) -> MISSION_COUNT_DATA {
        MISSION_COUNT_DATA {
            count,
            target_system: 1,
            target_component: 1,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
            opaque_id: 0,
        }
    }

    fn ack_result(replies: &[MavMessage]) -> Option<MavMissionResult> {
        replies.iter().find_map(|m| match m {
            MavMessage::MISSION_ACK(a) => Some(a.mavtype),
            _ => None,
        })
    }

    #[test]
    fn test_full_upload() {
        let mut h = Harness::new();
        let (replies, queued) = h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(2)));
        assert!(replies.is_empty());
        assert_eq!(queued, [MessageId::NextWaypoint]);
        assert!(matches!(
            next_waypoint_request(&h.upload),
            Some(MavMessage::MISSION_REQUEST(r)) if r.seq == 0 && r.target_system == 255
        ));

        let first = item(0, MavFrame::MAV_FRAME_GLOBAL, MavCmd::MAV_CMD_NAV_WAYPOINT);
        let (replies, queued) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&first).into()));
        assert!(replies.is_empty());
        assert_eq!(queued, [MessageId::NextWaypoint]);

        let second = item(1, MavFrame::MAV_FRAME_GLOBAL, MavCmd::MAV_CMD_NAV_WAYPOINT);
        let (replies, _) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&second).into()));
        assert_eq!(ack_result(&replies), Some(MavMissionResult::MAV_MISSION_ACCEPTED));
        assert_eq!(h.vehicle.mission.len(), 2);
        assert_eq!(h.vehicle.upload_completions, 1);
        assert!(!h.upload.is_receiving());
        assert_eq!(
            h.notifier.peek().map(|t| t.severity),
            Some(MavSeverity::MAV_SEVERITY_INFO)
        );
    }

    #[test]
    fn test_count_larger_than_capacity() {
        let mut h = Harness::new();
        let too_many = h.vehicle.mission_capacity + 1;
        let (replies, _) = h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(too_many)));
        assert_eq!(ack_result(&replies), Some(MavMissionResult::MAV_MISSION_NO_SPACE));
        assert!(!h.upload.is_receiving());
    }

    #[test]
    fn test_zero_count_clears_and_accepts() {
        let mut h = Harness::new();
        h.vehicle.push_waypoint(Location::new(1, 2, 3));
        let (replies, queued) = h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(0)));
        assert_eq!(ack_result(&replies), Some(MavMissionResult::MAV_MISSION_ACCEPTED));
        assert!(queued.is_empty());
        assert!(h.vehicle.mission.is_empty());
    }

    #[test]
    fn test_out_of_sequence_aborts() {
        let mut h = Harness::new();
        h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(3)));
        let wrong = item(2, MavFrame::MAV_FRAME_GLOBAL, MavCmd::MAV_CMD_NAV_WAYPOINT);
        let (replies, _) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&wrong).into()));
        assert_eq!(
            ack_result(&replies),
            Some(MavMissionResult::MAV_MISSION_INVALID_SEQUENCE)
        );
        assert!(!h.upload.is_receiving());
    }

    #[test]
    fn test_item_after_abort_is_a_fresh_request() {
        let mut h = Harness::new();
        h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(3)));
        let wrong = item(2, MavFrame::MAV_FRAME_GLOBAL, MavCmd::MAV_CMD_NAV_WAYPOINT);
        h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&wrong).into()));

        // The expected item arrives too late: no session is open any more
        let next = item(0, MavFrame::MAV_FRAME_GLOBAL, MavCmd::MAV_CMD_NAV_WAYPOINT);
        let (replies, queued) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&next).into()));
        assert_eq!(ack_result(&replies), Some(MavMissionResult::MAV_MISSION_ERROR));
        assert!(queued.is_empty());
        assert!(h.vehicle.mission.is_empty());
        assert!(!h.upload.is_receiving());

        // A new MISSION_COUNT starts over from item 0
        let (_, queued) = h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(1)));
        assert_eq!(queued, [MessageId::NextWaypoint]);
        let (replies, _) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&next).into()));
        assert_eq!(ack_result(&replies), Some(MavMissionResult::MAV_MISSION_ACCEPTED));
        assert_eq!(h.vehicle.mission.len(), 1);
    }

    #[test]
    fn test_local_offset_out_of_range() {
        let mut h = Harness::new();
        h.vehicle.home = Some(Location::new(470_000_000, 80_000_000, 0));
        h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(2)));
        let mut far = item(0, MavFrame::MAV_FRAME_LOCAL_NED, MavCmd::MAV_CMD_NAV_WAYPOINT);
        far.x = 1.0e9;
        far.y = 0.0;
        let (replies, _) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&far).into()));
        assert_eq!(
            ack_result(&replies),
            Some(MavMissionResult::MAV_MISSION_INVALID_PARAM)
        );
        assert!(!h.upload.is_receiving());
        assert!(h.vehicle.mission.is_empty());

        // Guided targets are refused without touching a session
        h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(2)));
        far.current = 2;
        let (replies, _) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&far).into()));
        assert_eq!(
            ack_result(&replies),
            Some(MavMissionResult::MAV_MISSION_INVALID_PARAM)
        );
        assert!(h.upload.is_receiving());
    }

    #[test]
    fn test_unsupported_frame() {
        let mut h = Harness::new();
        h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(1)));
        let bad = item(0, MavFrame::MAV_FRAME_BODY_NED, MavCmd::MAV_CMD_NAV_WAYPOINT);
        let (replies, _) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&bad).into()));
        assert_eq!(
            ack_result(&replies),
            Some(MavMissionResult::MAV_MISSION_UNSUPPORTED_FRAME)
        );
    }

    #[test]
    fn test_do_jump_target_checked() {
        let mut h = Harness::new();
        h.run(&PLANE, |ctx, up| handle_count(ctx, up, &count(2)));
        let mut jump = item(0, MavFrame::MAV_FRAME_MISSION, MavCmd::MAV_CMD_DO_JUMP);
        jump.param1 = 5.0;
        let (replies, _) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&jump).into()));
        assert_eq!(ack_result(&replies), Some(MavMissionResult::MAV_MISSION_ERROR));
    }

    #[test]
    fn test_item_without_session_is_error() {
        let mut h = Harness::new();
        let stray = item(0, MavFrame::MAV_FRAME_GLOBAL, MavCmd::MAV_CMD_NAV_WAYPOINT);
        let (replies, _) = h.run(&PLANE, |ctx, up| handle_item(ctx, up, (&stray).into()));
        assert_eq!(ack_result(&replies), Some(MavMissionResult::MAV_MISSION_ERROR));
    }

    #[test]
    fn test_partial_list_range_checks() {
        let mut h = Harness::new();
        h.vehicle.push_waypoint(Location::new(1, 2, 3));
        let partial = |start, end| MISSION_WRITE_PARTIAL_LIST_DATA {
            start_index: start,
            end_index: end,
            target_system: 1,
            target_component: 1,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        };

        let (_, queued) = h.run(&PLANE, |ctx, up| {
            handle_write_partial_list(ctx, up, &partial(1, 0))
        });
        assert!(queued.is_empty());
        assert_eq!(h.notifier.len(), 1);

        let (_, queued) = h.run(&PLANE, |ctx, up| {
            handle_write_partial_list(ctx, up, &partial(0, 1))
        });
        assert_eq!(queued, [MessageId::NextWaypoint]);
        assert!(h.upload.is_receiving());
    }

    #[test]
    fn test_download() {
        let mut h = Harness::new();
        h.vehicle
            .push_waypoint(Location::new(470_000_000, 80_000_000, 10_000));
        let (replies, _) = h.run(&PLANE, |ctx, _| handle_request(ctx, 0, true));
        assert!(matches!(
            &replies[0],
            MavMessage::MISSION_ITEM_INT(i)
                if i.x == 470_000_000 && i.z == 100.0 && i.frame == MavFrame::MAV_FRAME_GLOBAL
        ));

        let (replies, _) = h.run(&PLANE, |ctx, _| handle_request(ctx, 1, false));
        assert_eq!(
            ack_result(&replies),
            Some(MavMissionResult::MAV_MISSION_INVALID_SEQUENCE)
        );
    }

    #[test]
    fn test_home_only_upload() {
        let mut h = Harness::new();
        let partial = MISSION_WRITE_PARTIAL_LIST_DATA {
            start_index: 0,
            end_index: 0,
            target_system: 1,
            target_component: 1,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        };
        let (_, queued) = h.run(&TRACKER, |ctx, up| {
            handle_write_partial_list(ctx, up, &partial)
        });
        assert_eq!(queued, [MessageId::NextWaypoint]);

        let home = item(0, MavFrame::MAV_FRAME_GLOBAL, MavCmd::MAV_CMD_NAV_WAYPOINT);
        let (replies, _) = h.run(&TRACKER, |ctx, up| handle_item(ctx, up, (&home).into()));
        assert_eq!(ack_result(&replies), Some(MavMissionResult::MAV_MISSION_ACCEPTED));
        let stored = h.vehicle.home.unwrap();
        assert_eq!(
            (stored.lat, stored.lng, stored.alt_cm),
            (470_000_000, 80_000_000, 50_000)
        );
        assert!(!h.upload.is_receiving());
    }
}
