use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{watch, Mutex, MutexGuard};

/// States of the connection loop, published on a watch channel so that the
/// streaming side and tests can observe transitions without touching the
/// socket itself. A client is ready to be streamed to once `Streaming` is
/// reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Listening,
    Accepted,
    Handshaking,
    Streaming,
    Closed,
}

/// Shared slot holding the write half of the currently served client.
///
/// The connection loop installs and clears the writer; the streaming side
/// locks the slot for the whole duration of a check-and-send, so a
/// disconnect can never interleave with a partially sent image and every
/// access tolerates the writer being gone.
#[derive(Clone)]
pub struct ConnectionSlot {
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    state_sender: Arc<watch::Sender<ConnectionState>>,
    state_receiver: watch::Receiver<ConnectionState>,
}

impl ConnectionSlot {
    pub fn new() -> Self {
        let (state_sender, state_receiver) = watch::channel(ConnectionState::Listening);

        Self {
            writer: Arc::new(Mutex::new(None)),
            state_sender: Arc::new(state_sender),
            state_receiver,
        }
    }

    pub async fn install(&self, writer: OwnedWriteHalf) {
        *self.writer.lock().await = Some(writer);
    }

    pub async fn lock_writer(&self) -> MutexGuard<'_, Option<OwnedWriteHalf>> {
        self.writer.lock().await
    }

    pub fn publish_state(&self, state: ConnectionState) {
        debug!("Connection state: {:?}", state);

        self.state_sender
            .send(state)
            .expect("Connection state channel closed");
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_receiver.borrow()
    }

    /// Drops the write half and publishes `Closed`. The socket is fully
    /// closed once the connection loop drops the read half as well.
    pub async fn close(&self) {
        self.writer.lock().await.take();
        self.publish_state(ConnectionState::Closed);
    }

    /// Waits until the connection loop reaches `Streaming`, up to `timeout`.
    /// A bounded notification wait, not a busy poll.
    pub async fn wait_streaming(&self, timeout: Duration) -> bool {
        let mut receiver = self.state_receiver.clone();

        let reached = tokio::time::timeout(timeout, async {
            while *receiver.borrow_and_update() != ConnectionState::Streaming {
                if receiver.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .is_ok();

        reached && self.state() == ConnectionState::Streaming
    }
}

impl Default for ConnectionSlot {
    fn default() -> Self {
        Self::new()
    }
}
