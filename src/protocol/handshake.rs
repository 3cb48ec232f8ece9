use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha1::{Digest, Sha1};

use crate::error::ProtocolError;

/// Fixed GUID appended to the client key, mandated by RFC6455.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const SEC_WEBSOCKET_KEY_HEADER: &str = "Sec-WebSocket-Key:";

/// Only a first buffer starting with "GET" triggers the handshake; anything
/// else is treated by the connection loop as already past it.
pub fn is_upgrade_request(buffer: &[u8]) -> bool {
    buffer.starts_with(b"GET")
}

pub fn extract_websocket_key(request: &str) -> Result<&str, ProtocolError> {
    request
        .lines()
        .find_map(|line| line.strip_prefix(SEC_WEBSOCKET_KEY_HEADER))
        .map(str::trim)
        .ok_or(ProtocolError::MissingWebSocketKey)
}

pub fn compute_accept_key(key: &str) -> String {
    let mut sha = Sha1::new();
    sha.update(key.as_bytes());
    sha.update(WEBSOCKET_GUID.as_bytes());
    BASE64.encode(sha.finalize())
}

/// Builds the verbatim 101 response for an upgrade request. The connection
/// keeps using the same socket afterwards.
pub fn upgrade_response(request: &str) -> Result<String, ProtocolError> {
    let key = extract_websocket_key(request)?;
    let accept = compute_accept_key(key);

    Ok(format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accept
    ))
}
