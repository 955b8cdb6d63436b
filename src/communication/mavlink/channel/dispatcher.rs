//! Message Dispatcher
//!
//! Maps a logical [`MessageId`] to a space check and a send action.
//!
//! `try_send_message` is all-or-nothing: it writes only when the link has
//! room for the message's worst-case size and the flight loop can spare the
//! time, otherwise it returns false with nothing written. `send_message`
//! layers a deferred queue on top so a refused id is retried, oldest first,
//! at the next send opportunity.

use mavlink::ardupilotmega::MavMessage;
use pico_trail_gcs_core::message::{frame_len, wire};
use pico_trail_gcs_core::MessageId;

use super::GcsChannel;
use crate::communication::mavlink::handlers::{mission, param};
use crate::communication::mavlink::transport::LinkPort;
use crate::communication::mavlink::vehicle::{TelemetryFrames, Vehicle};

impl<L: LinkPort> GcsChannel<L> {
    /// Whether the link and the flight loop allow a send right now.
    ///
    /// Flags the tick as out of time when the main loop is short; the
    /// scheduler stops evaluating streams once that happens.
    pub fn should_try_send_message(&mut self, vehicle: &dyn Vehicle) -> bool {
        let backpressure = self.profile.backpressure;

        if backpressure.honour_telemetry_delay && self.config.telemetry_delayed(vehicle.now_ms()) {
            return false;
        }

        if backpressure.enforce_time_budget
            && !vehicle.in_mavlink_delay()
            && vehicle.time_available_us() < self.config.min_time_budget_us
        {
            self.out_of_time = true;
            return false;
        }

        true
    }

    /// Send `id` now if it fits; nothing is written otherwise.
    ///
    /// Placeholder ids succeed without writing.
    pub fn try_send_message(&mut self, id: MessageId, vehicle: &dyn Vehicle) -> bool {
        if !self.initialised {
            return false;
        }
        if self.profile.is_placeholder(id) {
            return true;
        }
        if !self.should_try_send_message(vehicle) {
            return false;
        }
        if !self.writer.has_space(id.spec().max_bytes()) {
            return false;
        }

        match id {
            MessageId::StatusText => self.send_status_text(),
            MessageId::NextParam => self.send_next_params(vehicle),
            MessageId::NextWaypoint => match mission::next_waypoint_request(&self.upload) {
                Some(request) => self.write_all(&[request]),
                None => true,
            },
            MessageId::MissionItemReached => match self.mission_item_reached {
                Some(seq) => self.write_all(&[mission::mission_item_reached_message(seq)]),
                None => true,
            },
            _ => {
                let mut frames = TelemetryFrames::new();
                vehicle.build_telemetry(id, &mut frames);
                let sent = self.write_all(&frames);
                if sent && id == MessageId::Heartbeat {
                    self.last_heartbeat_ms = vehicle.now_ms();
                }
                sent
            }
        }
    }

    /// Send `id`, deferring it when it cannot go out now.
    ///
    /// Deferred ids are retried in order before `id` is considered; an id is
    /// queued at most once. [`MessageId::RetryDeferred`] only drains the
    /// queue.
    pub fn send_message(&mut self, id: MessageId, vehicle: &dyn Vehicle) {
        while let Some(&pending) = self.deferred.front() {
            if !self.try_send_message(pending, vehicle) {
                break;
            }
            self.deferred.pop_front();
        }

        if id == MessageId::RetryDeferred {
            return;
        }
        if self.deferred.iter().any(|&queued| queued == id) {
            return;
        }

        // Keep FIFO order: nothing jumps an occupied queue
        if !self.deferred.is_empty() || !self.try_send_message(id, vehicle) {
            if self.deferred.push_back(id).is_err() {
                crate::log_warn!("Channel {} deferred queue full", self.index);
            }
        }
    }

    /// Send queued status texts, deferring the rest
    pub fn flush_status_text(&mut self, vehicle: &dyn Vehicle) {
        if !self.notifier.is_empty() {
            self.send_message(MessageId::StatusText, vehicle);
        }
    }

    /// Write every frame or stop at the first that does not fit
    fn write_all(&mut self, frames: &[MavMessage]) -> bool {
        for frame in frames {
            if let Err(_e) = self.writer.write(frame) {
                crate::log_debug!("Channel {} send failed: {}", self.index, _e);
                return false;
            }
        }
        true
    }

    /// STATUSTEXT chunks while they fit; true once the queue is empty
    fn send_status_text(&mut self) -> bool {
        let chunk_len = frame_len(wire::STATUSTEXT);
        while self.writer.has_space(chunk_len) {
            let Some(chunk) = self.notifier.peek() else {
                break;
            };
            let message = MavMessage::STATUSTEXT(chunk.clone());
            if self.writer.write(&message).is_err() {
                break;
            }
            self.notifier.pop();
        }
        self.notifier.is_empty()
    }

    /// One burst of the parameter download
    fn send_next_params(&mut self, vehicle: &dyn Vehicle) -> bool {
        if !self.params.is_active() {
            return true;
        }

        let value_len = frame_len(wire::PARAM_VALUE);
        let mut budget = self.writer.tx_space() / value_len;
        if !self.writer.link().has_flow_control() {
            budget = budget.min(self.config.params_per_burst as usize);
        }

        let count = vehicle.param_count();
        for _ in 0..budget {
            let Some((index, entry)) = self.params.next_entry(vehicle) else {
                break;
            };
            let message = param::param_value_message(&entry, index, count);
            if let Err(_e) = self.writer.write(&message) {
                crate::log_warn!("Parameter {} not sent: {}", index, _e);
                break;
            }
        }

        if !self.params.is_active() {
            crate::log_info!("Parameter download complete on channel {}", self.index);
        }
        true
    }
}
