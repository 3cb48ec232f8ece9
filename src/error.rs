use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons for which a streaming tick is abandoned without sending an image.
#[derive(Error, Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Copy)]
pub enum DropReason {
    #[error("No client in streaming state")]
    ClientNotReady,

    #[error("No connected client")]
    NoConnectedClient,

    #[error("Image production failed")]
    ProductionFailed,

    #[error("Image encoding failed")]
    EncodingFailed,

    #[error("No encoded image")]
    NoEncodedImage,

    #[error("Image transfer failed")]
    TransferFailed,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Frame header is truncated")]
    TruncatedHeader,

    #[error("Declared payload length {declared} exceeds the {available} received bytes")]
    LengthMismatch { declared: usize, available: usize },

    #[error("Missing Sec-WebSocket-Key header")]
    MissingWebSocketKey,

    #[error("Malformed image request: {0}")]
    MalformedImageRequest(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ServerError {
    /// Bind conflicts are expected while the previous listener is torn down
    /// and are suppressed by the connection loop instead of being logged.
    pub fn is_bind_conflict(&self) -> bool {
        match self {
            ServerError::Io(e) => e.kind() == std::io::ErrorKind::AddrInUse,
            _ => false,
        }
    }
}
