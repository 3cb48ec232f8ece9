use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use log::warn;

use crate::error::DropReason;
use crate::types::{ImageRequest, TickData, Vector3};

use super::ImageProducer;

/// Stand-in for the engine camera: renders a synthetic gradient with a
/// moving scanline and PNG-encodes it at the requested size. The requested
/// pose tints the gradient so viewer requests are visibly exercised.
pub struct PatternImageProducer {
    width: u32,
    height: u32,
    position: Vector3,
    rotation: Vector3,
    ticks: u64,
}

impl PatternImageProducer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            position: Default::default(),
            rotation: Default::default(),
            ticks: 0,
        }
    }

    fn apply_request(&mut self, request: &ImageRequest) {
        if request.w > 0 && request.h > 0 {
            self.width = request.w;
            self.height = request.h;
        }

        // With the follow flag set the camera tracks the host viewpoint and
        // the requested pose is ignored.
        if !request.f {
            self.position = request.p;
            self.rotation = request.r;
        }
    }

    fn render(&self) -> RgbaImage {
        let width = self.width;
        let height = self.height;

        let scanline = (self.ticks % height as u64) as u32;
        let tint_red = pose_channel(self.position.x + self.rotation.x);
        let tint_green = pose_channel(self.position.y + self.rotation.y);
        let tint_blue = pose_channel(self.position.z + self.rotation.z);

        RgbaImage::from_fn(width, height, |x, y| {
            if y == scanline {
                return Rgba([255, 255, 255, 255]);
            }

            let horizontal = (x as u64 * 255 / width as u64) as u8;
            let vertical = (y as u64 * 255 / height as u64) as u8;

            Rgba([
                horizontal.wrapping_add(tint_red),
                vertical.wrapping_add(tint_green),
                tint_blue,
                255,
            ])
        })
    }
}

fn pose_channel(value: f32) -> u8 {
    (value * 16.0).rem_euclid(256.0) as u8
}

#[async_trait]
impl ImageProducer for PatternImageProducer {
    async fn produce(
        &mut self,
        request: Option<&ImageRequest>,
        tick_data: &mut TickData,
    ) -> Result<(), DropReason> {
        if let Some(request) = request {
            self.apply_request(request);
        }

        self.ticks = self.ticks.wrapping_add(1);

        let image = self.render();

        let mut encoded = Cursor::new(Vec::new());
        image
            .write_to(&mut encoded, ImageFormat::Png)
            .map_err(|error| {
                warn!("PNG encoding failed: {}", error);
                DropReason::EncodingFailed
            })?;

        tick_data.insert_encoded_image(Bytes::from(encoded.into_inner()));

        Ok(())
    }
}
