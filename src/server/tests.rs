use std::time::Duration;

use crate::error::{ProtocolError, ServerError};
use crate::types::{ImageRequest, Vector3};

use super::acceptor::RestartPolicy;
use super::connection::{ConnectionSlot, ConnectionState};
use super::session::{
    build_image_frames, decode_image_request, SessionState, IMAGE_HEADER_TAG, MAX_CHUNK_SIZE,
};

/// Strips the server frame header (FIN/opcode byte plus the unmasked length
/// field) and returns the payload.
fn server_frame_payload(frame: &[u8]) -> &[u8] {
    assert_eq!(frame[0], 0x82);

    match frame[1] {
        126 => {
            let length = u16::from_be_bytes([frame[2], frame[3]]) as usize;
            &frame[4..4 + length]
        }
        127 => {
            let mut length_bytes = [0u8; 8];
            length_bytes.copy_from_slice(&frame[2..10]);
            let length = u64::from_be_bytes(length_bytes) as usize;
            &frame[10..10 + length]
        }
        length => {
            assert!(length < 126);
            &frame[2..2 + length as usize]
        }
    }
}

fn declared_image_length(header_payload: &[u8]) -> usize {
    assert_eq!(header_payload.len(), 7);
    assert_eq!(&header_payload[..3], &IMAGE_HEADER_TAG);

    let mut length_bytes = [0u8; 4];
    length_bytes.copy_from_slice(&header_payload[3..]);
    u32::from_le_bytes(length_bytes) as usize
}

const VALID_REQUEST: &str = r#"{
    "w": 100, "h": 100,
    "p": {"x": 0.0, "y": 1.5, "z": 0.0},
    "r": {"x": 0.0, "y": 90.0, "z": 0.0},
    "m": [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1],
    "f": true, "t": false
}"#;

#[test]
fn decode_image_request_test() {
    let request = decode_image_request(VALID_REQUEST.as_bytes()).unwrap();

    assert_eq!(request.w, 100);
    assert_eq!(request.h, 100);
    assert_eq!(request.p, Vector3 { x: 0.0, y: 1.5, z: 0.0 });
    assert_eq!(request.r.y, 90.0);
    assert_eq!(request.m[0], 1.0);
    assert_eq!(request.m[15], 1.0);
    assert!(request.f);
    assert!(!request.t);
}

#[test]
fn decode_malformed_request_test() {
    let result = decode_image_request(b"{\"w\": not json");

    assert!(matches!(
        result,
        Err(ProtocolError::MalformedImageRequest(_))
    ));
}

#[test]
fn malformed_payload_clears_pending_request_test() {
    let session = SessionState::new();

    session.handle_payload(VALID_REQUEST.as_bytes());
    assert!(session.latest_request().is_some());

    session.handle_payload(b"garbage");
    assert!(session.latest_request().is_none());
}

#[test]
fn latest_request_wins_test() {
    let session = SessionState::new();

    session.handle_payload(VALID_REQUEST.as_bytes());
    let replacement = ImageRequest {
        w: 320,
        h: 240,
        p: Vector3::default(),
        r: Vector3::default(),
        m: [0.0; 16],
        f: false,
        t: false,
    };
    session.handle_payload(serde_json::to_string(&replacement).unwrap().as_bytes());

    assert_eq!(session.latest_request(), Some(replacement));
}

#[test]
fn image_frames_header_layout_test() {
    let image = vec![7u8; 1000];
    let frames = build_image_frames(&image);

    assert_eq!(frames.len(), 2);
    assert_eq!(declared_image_length(server_frame_payload(&frames[0])), 1000);
    assert_eq!(server_frame_payload(&frames[1]), &image[..]);
}

#[test]
fn image_frames_chunking_test() {
    let image: Vec<u8> = (0..150000).map(|index| index as u8).collect();
    let frames = build_image_frames(&image);

    // ceil(150000 / 60000) chunks plus the header frame.
    assert_eq!(frames.len(), 1 + 3);

    let declared = declared_image_length(server_frame_payload(&frames[0]));
    assert_eq!(declared, image.len());

    let reassembled: Vec<u8> = frames[1..]
        .iter()
        .flat_map(|frame| server_frame_payload(frame).to_vec())
        .collect();
    assert_eq!(reassembled, image);

    for frame in &frames[1..] {
        assert!(server_frame_payload(frame).len() <= MAX_CHUNK_SIZE);
    }
}

#[test]
fn empty_image_frames_test() {
    let frames = build_image_frames(&[]);

    assert_eq!(frames.len(), 1);
    assert_eq!(declared_image_length(server_frame_payload(&frames[0])), 0);
}

#[test]
fn successive_images_never_interleave_test() {
    let first = vec![1u8; 70000];
    let second = vec![2u8; 65000];

    // Each image is built and written as one locked batch; the bytes between
    // two header frames must reassemble exactly the declared length.
    let mut wire = Vec::new();
    for frames in [build_image_frames(&first), build_image_frames(&second)] {
        for frame in &frames {
            wire.push(frame.clone());
        }
    }

    let first_declared = declared_image_length(server_frame_payload(&wire[0]));
    let first_bytes: usize = wire[1..3]
        .iter()
        .map(|frame| server_frame_payload(frame).len())
        .sum();
    assert_eq!(first_declared, first_bytes);

    let second_declared = declared_image_length(server_frame_payload(&wire[3]));
    let second_bytes: usize = wire[4..]
        .iter()
        .map(|frame| server_frame_payload(frame).len())
        .sum();
    assert_eq!(second_declared, second_bytes);
}

#[test]
fn restart_policy_test() {
    assert_eq!(RestartPolicy::default().backoff(), Duration::from_secs(1));

    let policy = RestartPolicy::fixed(Duration::from_millis(250));
    assert_eq!(policy.backoff(), Duration::from_millis(250));
}

#[test]
fn bind_conflict_classification_test() {
    let conflict = ServerError::Io(std::io::Error::from(std::io::ErrorKind::AddrInUse));
    assert!(conflict.is_bind_conflict());

    let refused = ServerError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
    assert!(!refused.is_bind_conflict());

    let protocol = ServerError::Protocol(ProtocolError::TruncatedHeader);
    assert!(!protocol.is_bind_conflict());
}

#[tokio::test]
async fn wait_streaming_test() {
    let slot = ConnectionSlot::new();

    assert!(!slot.wait_streaming(Duration::from_millis(20)).await);

    slot.publish_state(ConnectionState::Streaming);
    assert!(slot.wait_streaming(Duration::from_millis(20)).await);

    slot.close().await;
    assert_eq!(slot.state(), ConnectionState::Closed);
    assert!(!slot.wait_streaming(Duration::from_millis(20)).await);
}

#[tokio::test]
async fn wait_streaming_wakes_on_transition_test() {
    let slot = ConnectionSlot::new();

    let waiter = {
        let slot = slot.clone();
        tokio::spawn(async move { slot.wait_streaming(Duration::from_secs(5)).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    slot.publish_state(ConnectionState::Streaming);

    assert!(waiter.await.unwrap());
}
