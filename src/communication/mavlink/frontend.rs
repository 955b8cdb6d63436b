//! Multi-Channel Fan-out
//!
//! [`GcsFrontend`] owns every GCS channel of the vehicle and replays
//! vehicle-wide operations (telemetry tick, status text, home updates,
//! mission progress) on each initialised channel. Inbound messages are
//! handled by the channel they arrived on; the events they raise are applied
//! to all channels here.

use heapless::Vec;
use mavlink::ardupilotmega::{MavMessage, MavSeverity};
use mavlink::MavHeader;
use pico_trail_gcs_core::{Location, MessageId};

use super::channel::{ChannelError, ChannelEvent, GcsChannel};
use super::config::GcsConfig;
use super::status_notifier::format_line;
use super::transport::LinkPort;
use super::vehicle::{Vehicle, VehicleProfile};

/// Maximum number of GCS links
pub const MAX_CHANNELS: usize = 4;

/// Every GCS channel of one vehicle
pub struct GcsFrontend<L: LinkPort> {
    profile: &'static VehicleProfile,
    config: GcsConfig,
    channels: Vec<GcsChannel<L>, MAX_CHANNELS>,
    /// Ticks since the last HEARTBEAT fan-out
    heartbeat_ticks: u16,
}

impl<L: LinkPort> GcsFrontend<L> {
    pub fn new(profile: &'static VehicleProfile, config: GcsConfig) -> Self {
        Self {
            profile,
            config,
            channels: Vec::new(),
            heartbeat_ticks: 0,
        }
    }

    pub fn profile(&self) -> &'static VehicleProfile {
        self.profile
    }

    pub fn config(&self) -> &GcsConfig {
        &self.config
    }

    /// Register a link; returns its channel index
    pub fn add_channel(&mut self, link: L) -> Result<usize, ChannelError> {
        let index = self.channels.len();
        let channel = GcsChannel::new(index as u8, link, self.profile, self.config);
        self.channels
            .push(channel)
            .map_err(|_| ChannelError::TableFull)?;
        Ok(index)
    }

    pub fn channel(&self, index: usize) -> Option<&GcsChannel<L>> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut GcsChannel<L>> {
        self.channels.get_mut(index)
    }

    pub fn channels(&self) -> impl Iterator<Item = &GcsChannel<L>> {
        self.channels.iter()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_initialised(&self) -> usize {
        self.active().count()
    }

    /// Link lost on `index`: reset the channel in place
    pub fn reset_channel(&mut self, index: usize) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .get_mut(index)
            .ok_or(ChannelError::InvalidIndex)?;
        channel.reset();
        Ok(())
    }

    /// Link back up on `index`
    pub fn init_channel(&mut self, index: usize) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .get_mut(index)
            .ok_or(ChannelError::InvalidIndex)?;
        channel.init();
        Ok(())
    }

    fn active(&self) -> impl Iterator<Item = &GcsChannel<L>> {
        self.channels.iter().filter(|ch| ch.is_initialised())
    }

    fn active_mut(&mut self) -> impl Iterator<Item = &mut GcsChannel<L>> {
        self.channels.iter_mut().filter(|ch| ch.is_initialised())
    }

    /// `send_message` on every initialised channel
    pub fn send_message(&mut self, id: MessageId, vehicle: &dyn Vehicle) {
        for channel in self.active_mut() {
            channel.send_message(id, vehicle);
        }
    }

    /// `data_stream_send` on every initialised channel
    pub fn data_stream_send(&mut self, vehicle: &mut dyn Vehicle) {
        for channel in self.active_mut() {
            channel.data_stream_send(&mut *vehicle);
        }
    }

    /// Session housekeeping and text drain on every initialised channel
    pub fn update(&mut self, vehicle: &dyn Vehicle) {
        for channel in self.active_mut() {
            channel.update(vehicle);
        }
    }

    /// One scheduler tick: housekeeping, a HEARTBEAT once per second, then
    /// telemetry streams
    pub fn tick(&mut self, vehicle: &mut dyn Vehicle) {
        self.update(&*vehicle);

        if self.heartbeat_ticks == 0 {
            self.send_message(MessageId::Heartbeat, &*vehicle);
        }
        self.heartbeat_ticks += 1;
        if self.heartbeat_ticks >= self.config.base_rate_hz as u16 {
            self.heartbeat_ticks = 0;
        }

        self.data_stream_send(vehicle);
    }

    /// Queue a status text on every initialised channel; it goes out on the
    /// next send opportunity of each channel
    pub fn send_text(&mut self, severity: MavSeverity, text: &str) {
        for channel in self.active_mut() {
            channel.send_text(severity, text);
        }
    }

    /// Report a new home on every initialised channel
    pub fn send_home(&mut self, home: &Location) {
        for channel in self.active_mut() {
            channel.send_home_position(home);
        }
        let text = format_line(format_args!("Set HOME to {}", home));
        self.send_text(MavSeverity::MAV_SEVERITY_INFO, text.as_str());
    }

    /// Tell every initialised channel the vehicle reached mission item `seq`
    pub fn send_mission_item_reached_message(&mut self, seq: u16, vehicle: &dyn Vehicle) {
        for channel in self.active_mut() {
            channel.set_mission_item_reached(seq);
            channel.send_message(MessageId::MissionItemReached, vehicle);
        }
    }

    /// Handle a message received on channel `index`
    pub fn handle_message(
        &mut self,
        index: usize,
        header: &MavHeader,
        message: &MavMessage,
        vehicle: &mut dyn Vehicle,
    ) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .get_mut(index)
            .ok_or(ChannelError::InvalidIndex)?;
        let events = channel.handle_message(header, message, &mut *vehicle);
        if events.is_empty() {
            return Ok(());
        }

        for event in &events {
            match event {
                ChannelEvent::HomeChanged(home) => self.send_home(home),
                ChannelEvent::Announce(severity, text) => self.send_text(*severity, text.as_str()),
            }
        }
        for channel in self.active_mut() {
            channel.flush_status_text(&*vehicle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mavlink::mock::{MockLink, MockVehicle};
    use crate::communication::mavlink::vehicle::PLANE;
    use mavlink::ardupilotmega::{MavCmd, COMMAND_LONG_DATA};
    use pico_trail_gcs_core::message::wire;

    const GCS: MavHeader = MavHeader {
        system_id: 255,
        component_id: 190,
        sequence: 0,
    };

    fn frontend(links: usize) -> GcsFrontend<MockLink> {
        let mut frontend = GcsFrontend::new(&PLANE, GcsConfig::default());
        for _ in 0..links {
            frontend.add_channel(MockLink::new(4096)).unwrap();
        }
        frontend
    }

    fn count(frontend: &GcsFrontend<MockLink>, index: usize, msg_id: u32) -> usize {
        frontend.channel(index).unwrap().link().count(msg_id)
    }

    #[test]
    fn test_table_capacity() {
        let mut frontend = frontend(MAX_CHANNELS);
        assert_eq!(
            frontend.add_channel(MockLink::new(64)),
            Err(ChannelError::TableFull)
        );
        assert_eq!(frontend.reset_channel(9), Err(ChannelError::InvalidIndex));
        assert_eq!(frontend.channel(2).unwrap().index(), 2);
    }

    #[test]
    fn test_send_skips_reset_channels() {
        let mut frontend = frontend(3);
        let vehicle = MockVehicle::new();
        frontend.reset_channel(1).unwrap();

        frontend.send_message(MessageId::Attitude, &vehicle);
        assert_eq!(count(&frontend, 0, wire::ATTITUDE), 1);
        assert_eq!(count(&frontend, 1, wire::ATTITUDE), 0);
        assert_eq!(count(&frontend, 2, wire::ATTITUDE), 1);
        assert_eq!(frontend.num_initialised(), 2);
    }

    #[test]
    fn test_set_home_broadcast() {
        let mut frontend = frontend(2);
        let mut vehicle = MockVehicle::new();
        let cmd = MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
            param5: 47.0,
            param6: 8.0,
            param7: 500.0,
            command: MavCmd::MAV_CMD_DO_SET_HOME,
            target_system: 1,
            target_component: 1,
            ..Default::default()
        });

        frontend.handle_message(0, &GCS, &cmd, &mut vehicle).unwrap();

        assert_eq!(count(&frontend, 0, wire::COMMAND_ACK), 1);
        assert_eq!(count(&frontend, 1, wire::COMMAND_ACK), 0);
        for index in 0..2 {
            assert_eq!(count(&frontend, index, wire::HOME_POSITION), 1);
            assert_eq!(count(&frontend, index, wire::STATUSTEXT), 1);
        }
    }

    #[test]
    fn test_heartbeat_once_per_second() {
        let mut frontend = frontend(1);
        let mut vehicle = MockVehicle::new();
        for _ in 0..100 {
            frontend.tick(&mut vehicle);
            frontend.channel_mut(0).unwrap().link_mut().drain();
        }
        assert_eq!(count(&frontend, 0, wire::HEARTBEAT), 2);
    }

    #[test]
    fn test_mission_item_reached_fan_out() {
        let mut frontend = frontend(2);
        let vehicle = MockVehicle::new();
        frontend.send_mission_item_reached_message(4, &vehicle);
        for index in 0..2 {
            assert!(frontend.channel(index).unwrap().link().frames().iter().any(|m| {
                matches!(m, MavMessage::MISSION_ITEM_REACHED(r) if r.seq == 4)
            }));
        }
    }
}
