//! Data-Stream Scheduler
//!
//! Called once per tick per channel. Parameter download traffic goes first
//! and ignores backpressure; telemetry streams follow in the profile's
//! priority order until the flight loop runs out of time.

use pico_trail_gcs_core::{MessageId, StreamId};

use super::GcsChannel;
use crate::communication::mavlink::transport::LinkPort;
use crate::communication::mavlink::vehicle::{TelemetryFrames, Vehicle};

/// PARAMS rate forced while a download is open but the stream is disabled
const PARAMS_FALLBACK_RATE_HZ: f32 = 10.0;

impl<L: LinkPort> GcsChannel<L> {
    /// Whether `stream` fires on this tick
    pub fn stream_trigger(&mut self, stream: StreamId) -> bool {
        let configured = self.rates.rate_hz(stream);
        let session_active = self.is_session_active();
        self.trigger.trigger(stream, configured, session_active)
    }

    /// Send everything due on this tick
    pub fn data_stream_send(&mut self, vehicle: &mut dyn Vehicle) {
        if !self.initialised {
            return;
        }
        self.out_of_time = false;

        if !vehicle.in_mavlink_delay() {
            self.log_send(vehicle);
        }

        if self.params.is_active() {
            if self.rates.rate_hz(StreamId::Params) <= 0.0 {
                self.rates
                    .set_rate_hz(StreamId::Params, PARAMS_FALLBACK_RATE_HZ);
            }
            if self.stream_trigger(StreamId::Params) {
                self.send_message(MessageId::NextParam, &*vehicle);
            }
        }

        if self.out_of_time || vehicle.in_mavlink_delay() {
            return;
        }

        let profile = self.profile;
        for spec in profile.streams {
            if spec.stream == StreamId::Params {
                continue;
            }
            if self.out_of_time {
                crate::log_trace!("Channel {} out of time", self.index);
                return;
            }
            if !self.stream_trigger(spec.stream) {
                continue;
            }
            for &id in spec.messages {
                if (profile.message_gate)(id, &*vehicle) {
                    self.send_message(id, &*vehicle);
                }
            }
        }
    }

    /// Log download frames handed out by the vehicle
    fn log_send(&mut self, vehicle: &mut dyn Vehicle) {
        let mut frames = TelemetryFrames::new();
        vehicle.log_send(&mut frames, self.in_log_download);
        for frame in &frames {
            if let Err(_e) = self.writer.write(frame) {
                crate::log_debug!("Log frame dropped: {}", _e);
                break;
            }
        }
    }
}
