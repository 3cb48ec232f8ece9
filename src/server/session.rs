use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use log::debug;
use tokio::sync::watch;

use crate::error::ProtocolError;
use crate::protocol::frame::{self, Opcode};
use crate::types::ImageRequest;

/// Magic tag opening the 7-byte image header frame.
pub const IMAGE_HEADER_TAG: [u8; 3] = [0x12, 0x06, 0x92];

/// Maximum payload carried by a single image chunk frame.
pub const MAX_CHUNK_SIZE: usize = 60000;

/// Latest-request slot fed by the connection loop and read by the streaming
/// tick. There is no queue: a newer request overwrites the previous one
/// before it is consumed, and a malformed payload clears the slot.
#[derive(Clone)]
pub struct SessionState {
    request_sender: Arc<watch::Sender<Option<ImageRequest>>>,
    request_receiver: watch::Receiver<Option<ImageRequest>>,
}

impl SessionState {
    pub fn new() -> Self {
        let (request_sender, request_receiver) = watch::channel(None);

        Self {
            request_sender: Arc::new(request_sender),
            request_receiver,
        }
    }

    pub fn latest_request(&self) -> Option<ImageRequest> {
        *self.request_receiver.borrow()
    }

    /// Handles one non-close frame payload. Decoding failures are soft: the
    /// pending request is cleared, the connection is kept.
    pub fn handle_payload(&self, payload: &[u8]) {
        let request = match decode_image_request(payload) {
            Ok(request) => {
                debug!("Image request: {:?}", request);
                Some(request)
            }
            Err(error) => {
                debug!("Discarding malformed image request: {}", error);
                None
            }
        };

        self.request_sender
            .send(request)
            .expect("Image request channel closed");
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn decode_image_request(payload: &[u8]) -> Result<ImageRequest, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Builds the wire frames for one outgoing image: a header frame carrying
/// the magic tag and the image length in little endian, followed by binary
/// chunk frames of at most `MAX_CHUNK_SIZE` payload bytes.
pub fn build_image_frames(image: &[u8]) -> Vec<Bytes> {
    let chunks_count = (image.len() + MAX_CHUNK_SIZE - 1) / MAX_CHUNK_SIZE;
    let mut frames = Vec::with_capacity(1 + chunks_count);

    let mut header = BytesMut::with_capacity(IMAGE_HEADER_TAG.len() + 4);
    header.put_slice(&IMAGE_HEADER_TAG);
    header.put_u32_le(image.len() as u32);
    frames.push(frame::encode_frame(&header, Opcode::Binary));

    for chunk in image.chunks(MAX_CHUNK_SIZE) {
        frames.push(frame::encode_frame(chunk, Opcode::Binary));
    }

    frames
}
