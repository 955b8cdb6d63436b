//! GCS Channel
//!
//! One [`GcsChannel`] per ground-station link. A channel owns everything that
//! is per-link: the frame writer, its stream rate table and trigger
//! counters, the deferred-message queue, the mission upload and parameter
//! download sessions, and its status-text queue. Vehicle state is borrowed
//! for the duration of each call, never stored.
//!
//! # Responsibilities
//!
//! - **Inbound routing** ([`handle_message`](GcsChannel::handle_message)):
//!   hand each received message to its protocol handler, write the replies,
//!   queue any follow-up sends and report cross-channel events
//! - **Dispatch** (`dispatcher`): `try_send_message` / `send_message`
//! - **Streaming** (`scheduler`): `data_stream_send`, once per tick
//! - **Housekeeping** ([`update`](GcsChannel::update)): mission upload
//!   re-requests and timeouts, status-text drain

mod dispatcher;
mod scheduler;

use core::fmt;

use heapless::Deque;
use mavlink::ardupilotmega::{MavMessage, MavMissionResult, MavSeverity};
use mavlink::MavHeader;
use pico_trail_gcs_core::{
    Location, MessageId, Peer, SessionPoll, StreamRates, StreamTrigger, UploadSession,
};

use super::config::GcsConfig;
use super::handlers::inputs::{RadioLinkStats, RadioReport};
use super::handlers::mission::InboundItem;
use super::handlers::param::ParamStream;
use super::handlers::{command, fence, inputs, mission, param, Events, HandlerContext};
use super::status_notifier::{StatusNotifier, TextLine};
use super::transport::LinkPort;
use super::vehicle::{InboundFeatures, MissionProtocol, Vehicle, VehicleProfile};
use super::writer::{FrameWriter, WriterStats};

/// Deferred queue capacity: every logical message at most once
pub const DEFERRED_CAPACITY: usize = MessageId::ALL.len();

/// Effect of an inbound message that reaches beyond its own channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Home moved; every channel reports HOME_POSITION and a status text
    HomeChanged(Location),
    /// Status text for every channel
    Announce(MavSeverity, TextLine),
}

/// Channel table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelError {
    /// Every channel slot is taken
    TableFull,
    /// No channel at this index
    InvalidIndex,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::TableFull => write!(f, "GCS channel table full"),
            ChannelError::InvalidIndex => write!(f, "No GCS channel at index"),
        }
    }
}

/// Per-channel protocol state the inbound handlers may mutate
struct Sessions<'a> {
    upload: &'a mut UploadSession,
    params: &'a mut ParamStream,
    rates: &'a mut StreamRates,
    trigger: &'a mut StreamTrigger,
    radio: &'a mut RadioLinkStats,
    in_log_download: &'a mut bool,
}

/// One GCS link
pub struct GcsChannel<L: LinkPort> {
    index: u8,
    initialised: bool,
    writer: FrameWriter<L>,
    profile: &'static VehicleProfile,
    config: GcsConfig,
    rates: StreamRates,
    trigger: StreamTrigger,
    deferred: Deque<MessageId, DEFERRED_CAPACITY>,
    upload: UploadSession,
    params: ParamStream,
    notifier: StatusNotifier,
    /// Set when a send found the main loop short of time; cleared each tick
    out_of_time: bool,
    last_heartbeat_ms: u32,
    /// Index for the next MISSION_ITEM_REACHED
    mission_item_reached: Option<u16>,
    in_log_download: bool,
    radio: RadioLinkStats,
}

impl<L: LinkPort> GcsChannel<L> {
    /// Create an initialised channel on `link`.
    ///
    /// `index` selects the `SRn_*` parameter names of its rate table.
    pub fn new(index: u8, link: L, profile: &'static VehicleProfile, config: GcsConfig) -> Self {
        crate::log_info!("GCS channel {} up ({})", index, profile.name);
        Self {
            index,
            initialised: true,
            writer: FrameWriter::new(link, config.system_id, config.component_id),
            profile,
            config,
            rates: StreamRates::new(index),
            trigger: StreamTrigger::new(config.trigger_policy()),
            deferred: Deque::new(),
            upload: UploadSession::new(),
            params: ParamStream::new(),
            notifier: StatusNotifier::new(),
            out_of_time: false,
            last_heartbeat_ms: 0,
            mission_item_reached: None,
            in_log_download: false,
            radio: RadioLinkStats::default(),
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Mark the link as up again after a [`reset`](Self::reset)
    pub fn init(&mut self) {
        self.initialised = true;
    }

    /// Link lost: drop every session, queue and counter in place.
    ///
    /// The rate table survives (it mirrors persisted parameters). The channel
    /// stays silent until [`init`](Self::init).
    pub fn reset(&mut self) {
        crate::log_info!("GCS channel {} reset", self.index);
        self.initialised = false;
        self.trigger.reset();
        self.trigger.set_slowdown(0);
        self.deferred.clear();
        self.upload.abort();
        self.params.stop();
        self.notifier.clear();
        self.out_of_time = false;
        self.mission_item_reached = None;
        self.in_log_download = false;
        self.radio = RadioLinkStats::default();
        self.writer.reset_stats();
    }

    pub fn profile(&self) -> &'static VehicleProfile {
        self.profile
    }

    pub fn config(&self) -> &GcsConfig {
        &self.config
    }

    pub fn rates(&self) -> &StreamRates {
        &self.rates
    }

    pub fn rates_mut(&mut self) -> &mut StreamRates {
        &mut self.rates
    }

    pub fn trigger(&self) -> &StreamTrigger {
        &self.trigger
    }

    pub fn link(&self) -> &L {
        self.writer.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.writer.link_mut()
    }

    pub fn link_stats(&self) -> WriterStats {
        self.writer.stats()
    }

    pub fn notifier_mut(&mut self) -> &mut StatusNotifier {
        &mut self.notifier
    }

    pub fn upload(&self) -> &UploadSession {
        &self.upload
    }

    pub fn param_stream(&self) -> &ParamStream {
        &self.params
    }

    pub fn is_out_of_time(&self) -> bool {
        self.out_of_time
    }

    /// Boot time of the last HEARTBEAT written on this link
    pub fn last_heartbeat_ms(&self) -> u32 {
        self.last_heartbeat_ms
    }

    pub fn in_log_download(&self) -> bool {
        self.in_log_download
    }

    pub fn radio_stats(&self) -> RadioLinkStats {
        self.radio
    }

    /// Ids waiting in the deferred queue, oldest first
    pub fn deferred(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.deferred.iter().copied()
    }

    /// A mission upload or parameter download is open
    pub fn is_session_active(&self) -> bool {
        self.upload.is_receiving() || self.params.is_active()
    }

    /// Remember `seq` for the next MISSION_ITEM_REACHED send
    pub fn set_mission_item_reached(&mut self, seq: u16) {
        self.mission_item_reached = Some(seq);
    }

    /// Queue a status text on this channel only
    pub fn send_text(&mut self, severity: MavSeverity, text: &str) {
        self.notifier.send(severity, text);
    }

    /// Report `home` as HOME_POSITION right away
    pub fn send_home_position(&mut self, home: &Location) {
        if self.initialised {
            self.write_reply(&command::home_position_message(home));
        }
    }

    /// Handle one received message.
    ///
    /// Replies go out on this channel at once (space permitting), follow-up
    /// sends such as NEXT_WAYPOINT go through the deferred dispatcher, and
    /// effects for every channel are returned to the caller.
    pub fn handle_message(
        &mut self,
        header: &MavHeader,
        message: &MavMessage,
        vehicle: &mut dyn Vehicle,
    ) -> Events {
        if !self.initialised {
            return Events::new();
        }

        let source = Peer::new(header.system_id, header.component_id);
        let mut sessions = Sessions {
            upload: &mut self.upload,
            params: &mut self.params,
            rates: &mut self.rates,
            trigger: &mut self.trigger,
            radio: &mut self.radio,
            in_log_download: &mut self.in_log_download,
        };
        let mut ctx = HandlerContext::new(
            &mut *vehicle,
            self.profile,
            &self.config,
            &mut self.notifier,
            source,
        );
        route(&mut ctx, &mut sessions, message);
        let (replies, queued, events) = ctx.finish();

        for reply in &replies {
            self.write_reply(reply);
        }
        for id in queued {
            self.send_message(id, &*vehicle);
        }
        self.flush_status_text(&*vehicle);
        events
    }

    /// Mission upload housekeeping and status-text drain; call every tick
    pub fn update(&mut self, vehicle: &dyn Vehicle) {
        if !self.initialised {
            return;
        }

        let poll = self.upload.poll(
            vehicle.now_ms(),
            self.config.mission_rerequest_ms,
            self.config.mission_timeout_ms,
        );
        match poll {
            SessionPoll::ReRequest => self.send_message(MessageId::NextWaypoint, vehicle),
            SessionPoll::TimedOut { peer } => {
                crate::log_warn!("Mission upload on channel {} timed out", self.index);
                let cancel =
                    mission::mission_ack_message(peer, MavMissionResult::MAV_MISSION_OPERATION_CANCELLED);
                self.write_reply(&cancel);
            }
            SessionPoll::Idle | SessionPoll::Waiting => {}
        }

        self.flush_status_text(vehicle);
    }

    /// Write a frame outside the dispatcher (handler replies, acks)
    fn write_reply(&mut self, message: &MavMessage) {
        if let Err(_e) = self.writer.write(message) {
            crate::log_warn!("Channel {} reply dropped: {}", self.index, _e);
        }
    }
}

impl<L: LinkPort> fmt::Debug for GcsChannel<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsChannel")
            .field("index", &self.index)
            .field("initialised", &self.initialised)
            .field("profile", &self.profile.name)
            .field("deferred", &self.deferred.len())
            .field("out_of_time", &self.out_of_time)
            .finish()
    }
}

/// Hand one inbound message to its handler
fn route(ctx: &mut HandlerContext<'_>, sessions: &mut Sessions<'_>, message: &MavMessage) {
    let features = ctx.profile.features;
    let full_mission = ctx.profile.mission == MissionProtocol::Full;

    match message {
        MavMessage::HEARTBEAT(data) => inputs::handle_heartbeat(ctx, data),
        MavMessage::COMMAND_LONG(data) => {
            command::handle_command_long(ctx, data);
        }
        MavMessage::SET_MODE(data) => inputs::handle_set_mode(ctx, data),
        MavMessage::REQUEST_DATA_STREAM(data) => {
            inputs::handle_request_data_stream(sessions.rates, data)
        }
        MavMessage::AUTOPILOT_VERSION_REQUEST(_) => {
            let version = command::autopilot_version_message(ctx.config);
            ctx.reply(version);
        }

        // Mission protocol
        MavMessage::MISSION_WRITE_PARTIAL_LIST(data) => {
            mission::handle_write_partial_list(ctx, sessions.upload, data)
        }
        MavMessage::MISSION_ITEM(data) => {
            mission::handle_item(ctx, sessions.upload, InboundItem::from(data))
        }
        MavMessage::MISSION_ITEM_INT(data) => {
            mission::handle_item(ctx, sessions.upload, InboundItem::from(data))
        }
        MavMessage::MISSION_REQUEST_LIST(data) if full_mission => {
            mission::handle_request_list(ctx, sessions.upload, data)
        }
        MavMessage::MISSION_REQUEST(data) if full_mission => {
            mission::handle_request(ctx, data.seq, false)
        }
        MavMessage::MISSION_REQUEST_INT(data) if full_mission => {
            mission::handle_request(ctx, data.seq, true)
        }
        MavMessage::MISSION_COUNT(data) if full_mission => {
            mission::handle_count(ctx, sessions.upload, data)
        }
        MavMessage::MISSION_CLEAR_ALL(data) if full_mission => mission::handle_clear_all(ctx, data),
        MavMessage::MISSION_SET_CURRENT(data) if full_mission => {
            mission::handle_set_current(ctx, data)
        }
        MavMessage::MISSION_ACK(_data) => {
            crate::log_debug!("MISSION_ACK from GCS: {}", _data.mavtype as u32);
        }

        // Parameter protocol
        MavMessage::PARAM_REQUEST_LIST(data) => {
            param::handle_request_list(ctx, sessions.params, data)
        }
        MavMessage::PARAM_REQUEST_READ(data) => {
            param::handle_request_read(ctx, sessions.rates, data)
        }
        MavMessage::PARAM_SET(data) => param::handle_set(ctx, sessions.rates, data),

        // Geofence and rally points
        MavMessage::FENCE_POINT(data) if features.contains(InboundFeatures::GEOFENCE) => {
            fence::handle_fence_point(ctx, data)
        }
        MavMessage::FENCE_FETCH_POINT(data) if features.contains(InboundFeatures::GEOFENCE) => {
            fence::handle_fence_fetch(ctx, data)
        }
        MavMessage::RALLY_POINT(data) if features.contains(InboundFeatures::RALLY) => {
            fence::handle_rally_point(ctx, data)
        }
        MavMessage::RALLY_FETCH_POINT(data) if features.contains(InboundFeatures::RALLY) => {
            fence::handle_rally_fetch(ctx, data)
        }

        // Link quality
        MavMessage::RADIO(data) => {
            let report = RadioReport {
                txbuf: data.txbuf,
                remrssi: data.remrssi,
            };
            inputs::handle_radio_status(ctx, sessions.trigger, sessions.radio, report);
        }
        MavMessage::RADIO_STATUS(data) => {
            ctx.vehicle.radio_status(data);
            let report = RadioReport {
                txbuf: data.txbuf,
                remrssi: data.remrssi,
            };
            inputs::handle_radio_status(ctx, sessions.trigger, sessions.radio, report);
        }

        MavMessage::RC_CHANNELS_OVERRIDE(data) => inputs::handle_rc_override(ctx, data),
        MavMessage::SET_HOME_POSITION(data) => inputs::handle_set_home_position(ctx, data),

        MavMessage::LOG_REQUEST_LIST(_)
        | MavMessage::LOG_REQUEST_DATA(_)
        | MavMessage::LOG_ERASE(_)
        | MavMessage::LOG_REQUEST_END(_) => {
            inputs::handle_log_message(ctx, sessions.in_log_download, message)
        }

        // Pass-through
        MavMessage::SERIAL_CONTROL(_) => ctx.vehicle.serial_control(message),
        MavMessage::GPS_INJECT_DATA(_) => ctx.vehicle.inject_gps(message),
        MavMessage::MANUAL_CONTROL(data) if features.contains(InboundFeatures::TRACKING_INPUTS) => {
            ctx.vehicle.manual_control(data)
        }
        MavMessage::GLOBAL_POSITION_INT(data)
            if features.contains(InboundFeatures::TRACKING_INPUTS) =>
        {
            ctx.vehicle.tracking_position(data)
        }
        MavMessage::SCALED_PRESSURE(data) if features.contains(InboundFeatures::TRACKING_INPUTS) => {
            ctx.vehicle.tracking_pressure(data)
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mavlink::mock::{MockLink, MockVehicle};
    use crate::communication::mavlink::vehicle::{PLANE, TRACKER};
    use mavlink::ardupilotmega::{
        MavCmd, MavFrame, MavMissionType, MavResult, COMMAND_LONG_DATA, MISSION_COUNT_DATA,
        PARAM_REQUEST_LIST_DATA, RADIO_STATUS_DATA,
    };
    use pico_trail_gcs_core::message::wire;

    const GCS: MavHeader = MavHeader {
        system_id: 255,
        component_id: 190,
        sequence: 0,
    };

    fn channel(profile: &'static VehicleProfile) -> GcsChannel<MockLink> {
        GcsChannel::new(0, MockLink::new(4096), profile, GcsConfig::default())
    }

    fn count(count: u16) -> MavMessage {
        MavMessage::MISSION_COUNT(MISSION_COUNT_DATA {
            count,
            target_system: 1,
            target_component: 1,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
            opaque_id: 0,
        })
    }

    #[test]
    fn test_command_acked_on_same_channel() {
        let mut ch = channel(&PLANE);
        let mut vehicle = MockVehicle::new();
        let arm = MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
            param1: 1.0,
            command: MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
            target_system: 1,
            target_component: 1,
            ..Default::default()
        });

        let events = ch.handle_message(&GCS, &arm, &mut vehicle);
        assert!(events.is_empty());
        assert!(vehicle.armed);
        assert_eq!(ch.link().count(wire::COMMAND_ACK), 1);
        assert!(matches!(
            &ch.link().frames()[0],
            MavMessage::COMMAND_ACK(ack) if ack.result == MavResult::MAV_RESULT_ACCEPTED
        ));
    }

    #[test]
    fn test_mission_count_requests_first_item() {
        let mut ch = channel(&PLANE);
        let mut vehicle = MockVehicle::new();

        ch.handle_message(&GCS, &count(3), &mut vehicle);

        assert!(ch.upload().is_receiving());
        assert!(ch.is_session_active());
        assert!(matches!(
            ch.link().frames(),
            [MavMessage::MISSION_REQUEST(r)] if r.seq == 0 && r.target_system == 255
        ));
    }

    #[test]
    fn test_tracker_ignores_mission_count() {
        let mut ch = channel(&TRACKER);
        let mut vehicle = MockVehicle::new();
        ch.handle_message(&GCS, &count(3), &mut vehicle);
        assert!(!ch.upload().is_receiving());
        assert!(ch.link().frames().is_empty());
    }

    #[test]
    fn test_upload_rerequest_then_timeout() {
        let mut ch = channel(&PLANE);
        let mut vehicle = MockVehicle::new();
        ch.handle_message(&GCS, &count(2), &mut vehicle);
        ch.link_mut().clear();

        vehicle.now = 1_500;
        ch.update(&vehicle);
        assert_eq!(ch.link().count(wire::MISSION_REQUEST), 1);

        vehicle.now = 9_000;
        ch.update(&vehicle);
        assert!(!ch.upload().is_receiving());
        assert!(ch.link().frames().iter().any(|m| matches!(
            m,
            MavMessage::MISSION_ACK(a)
                if a.mavtype == MavMissionResult::MAV_MISSION_OPERATION_CANCELLED
        )));
    }

    #[test]
    fn test_param_list_sends_firmware_text() {
        let mut ch = channel(&PLANE);
        let mut vehicle = MockVehicle::with_params(&[("A", 1.0)]);
        let list = MavMessage::PARAM_REQUEST_LIST(PARAM_REQUEST_LIST_DATA {
            target_system: 1,
            target_component: 1,
        });

        ch.handle_message(&GCS, &list, &mut vehicle);
        assert!(ch.param_stream().is_active());
        assert_eq!(ch.link().count(wire::STATUSTEXT), 1);
    }

    #[test]
    fn test_radio_status_slows_streams() {
        let mut ch = channel(&TRACKER);
        let mut vehicle = MockVehicle::new();
        let status = MavMessage::RADIO_STATUS(RADIO_STATUS_DATA {
            txbuf: 10,
            remrssi: 120,
            ..Default::default()
        });

        ch.handle_message(&GCS, &status, &mut vehicle);
        assert_eq!(ch.trigger().slowdown(), 3);
        assert_eq!(ch.radio_stats().remrssi, 120);
        assert_eq!(vehicle.radio_reports, 1);
    }

    #[test]
    fn test_tracking_inputs_only_on_tracker() {
        let position = MavMessage::GLOBAL_POSITION_INT(Default::default());
        let mut vehicle = MockVehicle::new();

        channel(&PLANE).handle_message(&GCS, &position, &mut vehicle);
        assert_eq!(vehicle.tracking_updates, 0);

        channel(&TRACKER).handle_message(&GCS, &position, &mut vehicle);
        assert_eq!(vehicle.tracking_updates, 1);
    }

    #[test]
    fn test_reset_silences_channel() {
        let mut ch = channel(&PLANE);
        let mut vehicle = MockVehicle::new();
        ch.handle_message(&GCS, &count(2), &mut vehicle);
        ch.send_text(MavSeverity::MAV_SEVERITY_INFO, "pending");

        ch.reset();
        assert!(!ch.is_initialised());
        assert!(!ch.is_session_active());
        assert_eq!(ch.deferred().count(), 0);

        ch.link_mut().clear();
        ch.handle_message(&GCS, &count(2), &mut vehicle);
        assert!(ch.link().frames().is_empty());

        ch.init();
        ch.handle_message(&GCS, &count(2), &mut vehicle);
        assert_eq!(ch.link().count(wire::MISSION_REQUEST), 1);
    }

    #[test]
    fn test_home_only_item_frame_check() {
        use mavlink::ardupilotmega::{MISSION_ITEM_DATA, MISSION_WRITE_PARTIAL_LIST_DATA};

        let mut ch = channel(&TRACKER);
        let mut vehicle = MockVehicle::new();
        let partial = MavMessage::MISSION_WRITE_PARTIAL_LIST(MISSION_WRITE_PARTIAL_LIST_DATA {
            start_index: 0,
            end_index: 0,
            target_system: 1,
            target_component: 1,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        });
        ch.handle_message(&GCS, &partial, &mut vehicle);

        let item = MavMessage::MISSION_ITEM(MISSION_ITEM_DATA {
            seq: 0,
            frame: MavFrame::MAV_FRAME_BODY_NED,
            command: MavCmd::MAV_CMD_NAV_WAYPOINT,
            ..Default::default()
        });
        ch.handle_message(&GCS, &item, &mut vehicle);
        assert!(!ch.upload().is_receiving());
        assert!(vehicle.home.is_none());
        assert!(ch.link().frames().iter().any(|m| matches!(
            m,
            MavMessage::MISSION_ACK(a) if a.mavtype == MavMissionResult::MAV_MISSION_UNSUPPORTED_FRAME
        )));
    }
}
