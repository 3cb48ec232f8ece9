use async_trait::async_trait;

use crate::error::DropReason;
use crate::types::{ImageRequest, TickData};

pub mod pattern;

#[cfg(test)]
mod tests;

/// Boundary towards the camera/render pipeline.
///
/// Implementations apply the viewer request (size, pose, projection and
/// flags), render a snapshot and write the encoded image bytes into the tick
/// data. With no request pending the previous settings are reused.
#[async_trait]
pub trait ImageProducer {
    async fn produce(
        &mut self,
        request: Option<&ImageRequest>,
        tick_data: &mut TickData,
    ) -> Result<(), DropReason>;
}
