//! GCS Scheduler Task
//!
//! Drives a [`GcsFrontend`] from an Embassy ticker at the configured base
//! rate. Each tick first drains whatever the link receivers have parsed,
//! then runs the frontend's telemetry tick.
//!
//! Embassy tasks cannot be generic, so the firmware wraps [`run`] in its own
//! `#[embassy_executor::task]` with concrete link and vehicle types:
//!
//! ```ignore
//! #[embassy_executor::task]
//! async fn gcs_task(mut frontend: GcsFrontend<UartLink>, mut vehicle: Plane) {
//!     run(&mut frontend, &mut vehicle, || rx_queue.try_receive().ok()).await
//! }
//! ```

use embassy_time::{Duration, Ticker};
use mavlink::ardupilotmega::MavMessage;
use mavlink::MavHeader;

use super::frontend::GcsFrontend;
use super::transport::LinkPort;
use super::vehicle::Vehicle;

/// A parsed inbound frame and the channel it arrived on
pub type Inbound = (usize, MavHeader, MavMessage);

/// Run the GCS layer forever.
///
/// `receive` is polled until it returns `None` at the start of every tick.
pub async fn run<L, R>(frontend: &mut GcsFrontend<L>, vehicle: &mut dyn Vehicle, mut receive: R) -> !
where
    L: LinkPort,
    R: FnMut() -> Option<Inbound>,
{
    let rate_hz = frontend.config().base_rate_hz.max(1);
    crate::log_info!("GCS task started at {} Hz", rate_hz);

    let mut ticker = Ticker::every(Duration::from_hz(rate_hz as u64));
    loop {
        while let Some((index, header, message)) = receive() {
            if let Err(_e) = frontend.handle_message(index, &header, &message, &mut *vehicle) {
                crate::log_warn!("Inbound frame dropped: {}", _e);
            }
        }

        frontend.tick(&mut *vehicle);
        ticker.next().await;
    }
}
