use std::time::Duration;

use clap::Parser;
use spectia::{
    capture::pattern::PatternImageProducer,
    common::command_line::parse_resolution_str,
    error::DropReason,
    server::{
        acceptor::RestartPolicy,
        profiling::{ConsoleAverageStatsLogger, ConsoleDropReasonsLogger, TickProfiler},
        SpectatorServer, SpectatorServerConfig,
    },
};

#[derive(Parser)]
#[clap(version = "0.1.0", author = "Lorenzo C. <aegroto@protonmail.com>")]
pub struct CommandLineOptions {
    #[clap(short, long, default_value = "8090")]
    port: u16,

    #[clap(long, default_value = "512x512")]
    resolution: String,

    #[clap(long, default_value = "100")]
    tick_interval: u64,

    #[clap(long, default_value = "500")]
    ready_timeout: u64,

    #[clap(long, default_value = "1000")]
    restart_backoff: u64,

    #[clap(long)]
    console_profiling: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let options = CommandLineOptions::parse();
    let (width, height) = parse_resolution_str(&options.resolution);

    let mut profilers: Vec<Box<dyn TickProfiler + Send>> = Vec::new();

    if options.console_profiling {
        profilers.push(Box::new(
            ConsoleAverageStatsLogger::new()
                .header(" -- Average streaming times")
                .log("spin_time")
                .log("produce_time")
                .log("transfer_time")
                .log("transmitted_bytes"),
        ));

        profilers.push(Box::new(ConsoleDropReasonsLogger {
            types_to_log: vec![
                DropReason::ClientNotReady,
                DropReason::NoConnectedClient,
                DropReason::ProductionFailed,
                DropReason::EncodingFailed,
                DropReason::TransferFailed,
            ],
            ..Default::default()
        }));
    }

    let config = SpectatorServerConfig {
        port: options.port,
        tick_interval: Duration::from_millis(options.tick_interval),
        ready_wait_timeout: Duration::from_millis(options.ready_timeout),
        restart_policy: RestartPolicy::fixed(Duration::from_millis(options.restart_backoff)),
        profilers,
    };

    let producer = Box::new(PatternImageProducer::new(width, height));

    SpectatorServer::new(config, producer).run().await;
}
