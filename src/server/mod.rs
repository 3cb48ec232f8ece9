use std::time::Duration;

use crate::capture::ImageProducer;

pub mod acceptor;
pub mod connection;
pub mod profiling;
pub mod session;
pub mod stream;

#[cfg(test)]
mod tests;

use acceptor::{launch_connection_task, RestartPolicy};
use connection::ConnectionSlot;
use profiling::TickProfiler;
use session::SessionState;
use stream::{launch_stream_task, StreamConfig};

pub struct SpectatorServerConfig {
    pub port: u16,
    pub tick_interval: Duration,
    pub ready_wait_timeout: Duration,
    pub restart_policy: RestartPolicy,
    pub profilers: Vec<Box<dyn TickProfiler + Send>>,
}

impl Default for SpectatorServerConfig {
    fn default() -> Self {
        Self {
            port: 8090,
            tick_interval: Duration::from_millis(100),
            ready_wait_timeout: Duration::from_millis(500),
            restart_policy: RestartPolicy::default(),
            profilers: Vec::new(),
        }
    }
}

pub struct SpectatorServer {
    config: SpectatorServerConfig,
    producer: Box<dyn ImageProducer + Send>,
}

impl SpectatorServer {
    pub fn new(config: SpectatorServerConfig, producer: Box<dyn ImageProducer + Send>) -> Self {
        Self { config, producer }
    }

    /// Runs the connection loop and the streaming tick loop until the host
    /// tears the runtime down.
    pub async fn run(self) {
        let slot = ConnectionSlot::new();
        let session = SessionState::new();

        let connection_handle = launch_connection_task(
            self.config.port,
            slot.clone(),
            session.clone(),
            self.config.restart_policy,
        );

        let stream_handle = launch_stream_task(
            self.producer,
            slot,
            session,
            self.config.profilers,
            StreamConfig {
                tick_interval: self.config.tick_interval,
                ready_wait_timeout: self.config.ready_wait_timeout,
            },
        );

        let _ = tokio::join!(connection_handle, stream_handle);
    }
}
