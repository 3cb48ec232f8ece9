use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::time::Duration;

use log::{debug, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::error::ServerError;
use crate::protocol::{frame, handshake};

use super::connection::{ConnectionSlot, ConnectionState};
use super::session::SessionState;

/// Size of the single receive buffer; one read is treated as one frame.
pub const RECEIVE_BUFFER_SIZE: usize = 100_000;

const SEND_BUFFER_SIZE: usize = 65536;

/// Backoff applied between two served connections. An explicit value with an
/// observable restart counter in the loop, not an implicit sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    backoff: Duration,
}

impl RestartPolicy {
    pub fn fixed(backoff: Duration) -> Self {
        Self { backoff }
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

/// Launches the connection loop: one client at a time, forever.
///
/// Bind conflicts are suppressed so repeated restarts do not spam the logs;
/// every other error tears the current connection down, is logged and leads
/// to a restart after the policy backoff. Never fatal to the process.
pub fn launch_connection_task(
    port: u16,
    slot: ConnectionSlot,
    session: SessionState,
    policy: RestartPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut restarts: u64 = 0;

        loop {
            match serve_client(port, &slot, &session).await {
                Ok(()) => info!("Client disconnected."),
                Err(error) if error.is_bind_conflict() => {}
                Err(error) => warn!("Connection error: {}", error),
            }

            slot.close().await;

            restarts += 1;
            debug!("Restarting listener (restart #{})", restarts);
            tokio::time::sleep(policy.backoff()).await;
        }
    })
}

/// Serves a single client through the
/// `Listening → Accepted → Handshaking → Streaming` states. Returns on a
/// clean disconnect (close frame or EOF); errors bubble up to the restart
/// handling in the loop.
async fn serve_client(
    port: u16,
    slot: &ConnectionSlot,
    session: &SessionState,
) -> Result<(), ServerError> {
    slot.publish_state(ConnectionState::Listening);
    let listener = bind_listener(port)?;

    let (stream, address) = listener.accept().await?;
    info!("A client connected: {}", address);
    slot.publish_state(ConnectionState::Accepted);

    let (mut reader, writer) = stream.into_split();
    slot.install(writer).await;

    let mut buffer = vec![0u8; RECEIVE_BUFFER_SIZE];

    // The first read is only inspected for an HTTP upgrade; any other
    // content is discarded and the loop proceeds as if past the handshake.
    let received = reader.read(&mut buffer).await?;
    if received == 0 {
        return Ok(());
    }

    if handshake::is_upgrade_request(&buffer[..received]) {
        slot.publish_state(ConnectionState::Handshaking);
        respond_to_handshake(slot, &buffer[..received]).await?;
    }

    slot.publish_state(ConnectionState::Streaming);

    loop {
        let received = reader.read(&mut buffer).await?;
        if received == 0 {
            return Ok(());
        }

        if let ControlFlow::Break(_) = handle_buffer(&buffer[..received], session)? {
            return Ok(());
        }
    }
}

async fn respond_to_handshake(slot: &ConnectionSlot, buffer: &[u8]) -> Result<(), ServerError> {
    let request = String::from_utf8_lossy(buffer);
    let response = handshake::upgrade_response(&request)?;

    let mut writer = slot.lock_writer().await;
    if let Some(writer) = writer.as_mut() {
        writer.write_all(response.as_bytes()).await?;
    }

    Ok(())
}

fn handle_buffer(buffer: &[u8], session: &SessionState) -> Result<ControlFlow<()>, ServerError> {
    if frame::is_close_frame(buffer[0]) {
        debug!("Close frame received");
        return Ok(ControlFlow::Break(()));
    }

    let payload = frame::decode_frame(buffer)?;
    session.handle_payload(&payload);

    Ok(ControlFlow::Continue(()))
}

/// IPv4 any-address listener with a backlog of 0 and a 65536 byte send
/// buffer.
fn bind_listener(port: u16) -> Result<TcpListener, ServerError> {
    let address = SocketAddr::from(([0, 0, 0, 0], port));

    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_send_buffer_size(SEND_BUFFER_SIZE)?;
    socket.bind(&address.into())?;
    socket.listen(0)?;
    socket.set_nonblocking(true)?;

    Ok(TcpListener::from_std(socket.into())?)
}
