use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use crate::capture::ImageProducer;
use crate::error::DropReason;
use crate::types::TickData;

use super::connection::ConnectionSlot;
use super::profiling::TickProfiler;
use super::session::{build_image_frames, SessionState};

pub struct StreamConfig {
    pub tick_interval: Duration,
    pub ready_wait_timeout: Duration,
}

/// Launches the streaming tick loop: once per tick, wait (bounded) for a
/// streaming client, produce an image for the latest request and flush it.
///
/// Every failure inside a tick is recorded as its drop reason and logged;
/// the next tick starts fresh from the latest request. Nothing propagates
/// out of the loop.
pub fn launch_stream_task(
    mut producer: Box<dyn ImageProducer + Send>,
    slot: ConnectionSlot,
    session: SessionState,
    mut profilers: Vec<Box<dyn TickProfiler + Send>>,
    config: StreamConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.tick_interval);

        loop {
            let spin_start_time = Instant::now();
            interval.tick().await;

            let mut tick_data = TickData::default();
            tick_data.set("spin_time", spin_start_time.elapsed().as_millis());

            if slot.wait_streaming(config.ready_wait_timeout).await {
                run_tick(&mut producer, &slot, &session, &mut tick_data).await;
            } else {
                tick_data.set_drop_reason(Some(DropReason::ClientNotReady));
            }

            for profiler in profilers.iter_mut() {
                profiler.log_tick(&tick_data);
            }
        }
    })
}

async fn run_tick(
    producer: &mut Box<dyn ImageProducer + Send>,
    slot: &ConnectionSlot,
    session: &SessionState,
    tick_data: &mut TickData,
) {
    let request = session.latest_request();

    let produce_start_time = Instant::now();
    if let Err(reason) = producer.produce(request.as_ref(), tick_data).await {
        debug!("Image production failed: {}", reason);
        tick_data.set_drop_reason(Some(reason));
        return;
    }
    tick_data.set("produce_time", produce_start_time.elapsed().as_millis());

    let image = match tick_data.extract_encoded_image() {
        Some(image) => image,
        None => {
            tick_data.set_drop_reason(Some(DropReason::NoEncodedImage));
            return;
        }
    };

    transfer(slot, &image, tick_data).await;
}

/// Writes the header frame and all chunk frames of one image while holding
/// the slot lock, so a concurrent disconnect cannot interleave with a
/// partially sent image.
async fn transfer(slot: &ConnectionSlot, image: &[u8], tick_data: &mut TickData) {
    let frames = build_image_frames(image);

    let transfer_start_time = Instant::now();
    let mut writer = slot.lock_writer().await;

    let writer = match writer.as_mut() {
        Some(writer) => writer,
        None => {
            tick_data.set_drop_reason(Some(DropReason::NoConnectedClient));
            return;
        }
    };

    let mut transmitted_bytes: usize = 0;

    for frame in &frames {
        if let Err(error) = writer.write_all(frame).await {
            warn!("Image transfer failed: {}", error);
            tick_data.set_drop_reason(Some(DropReason::TransferFailed));
            return;
        }

        transmitted_bytes += frame.len();
    }

    tick_data.set("transfer_time", transfer_start_time.elapsed().as_millis());
    tick_data.set("transmitted_bytes", transmitted_bytes as u128);
}
