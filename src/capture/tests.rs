use crate::types::{ImageRequest, TickData, Vector3};

use super::pattern::PatternImageProducer;
use super::ImageProducer;

fn request(width: u32, height: u32) -> ImageRequest {
    ImageRequest {
        w: width,
        h: height,
        p: Vector3 { x: 1.0, y: 2.0, z: 3.0 },
        r: Vector3::default(),
        m: [0.0; 16],
        f: false,
        t: false,
    }
}

#[tokio::test]
async fn pattern_producer_emits_png_test() {
    let mut producer = PatternImageProducer::new(100, 100);
    let mut tick_data = TickData::default();

    producer.produce(None, &mut tick_data).await.unwrap();

    let image = tick_data.extract_encoded_image().unwrap();
    let decoded = image::load_from_memory(&image).unwrap().to_rgba8();

    assert_eq!(decoded.width(), 100);
    assert_eq!(decoded.height(), 100);
}

#[tokio::test]
async fn pattern_producer_applies_requested_size_test() {
    let mut producer = PatternImageProducer::new(100, 100);
    let mut tick_data = TickData::default();

    producer
        .produce(Some(&request(64, 48)), &mut tick_data)
        .await
        .unwrap();

    let image = tick_data.extract_encoded_image().unwrap();
    let decoded = image::load_from_memory(&image).unwrap().to_rgba8();

    assert_eq!(decoded.width(), 64);
    assert_eq!(decoded.height(), 48);
}

#[tokio::test]
async fn pattern_producer_reuses_previous_settings_test() {
    let mut producer = PatternImageProducer::new(100, 100);
    let mut tick_data = TickData::default();

    producer
        .produce(Some(&request(32, 32)), &mut tick_data)
        .await
        .unwrap();
    tick_data.extract_encoded_image().unwrap();

    // No pending request on the next tick: the last applied size sticks.
    producer.produce(None, &mut tick_data).await.unwrap();

    let image = tick_data.extract_encoded_image().unwrap();
    let decoded = image::load_from_memory(&image).unwrap().to_rgba8();

    assert_eq!(decoded.width(), 32);
    assert_eq!(decoded.height(), 32);
}
