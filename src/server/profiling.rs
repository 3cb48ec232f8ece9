use std::time::{Duration, Instant};

use log::info;

use crate::error::DropReason;
use crate::types::TickData;

pub trait TickProfiler {
    fn log_tick(&mut self, tick_data: &TickData);
}

/// Logs round averages of selected tick statistics to the console.
pub struct ConsoleAverageStatsLogger {
    header: Option<String>,
    values_to_log: Vec<String>,
    round_duration: Duration,

    current_round_start: Instant,

    logged_ticks: Vec<TickData>,
}

impl Default for ConsoleAverageStatsLogger {
    fn default() -> Self {
        Self {
            header: None,
            values_to_log: Vec::new(),
            round_duration: Duration::from_secs(1),
            current_round_start: Instant::now(),
            logged_ticks: Vec::new(),
        }
    }
}

impl ConsoleAverageStatsLogger {
    pub fn new() -> Self {
        Self::default()
    }

    // Building functions
    pub fn header(mut self, header: &str) -> Self {
        self.header = Some(header.to_string());
        self
    }

    pub fn log(mut self, value: &str) -> Self {
        self.values_to_log.push(value.to_string());
        self
    }

    // Logging functions
    fn print_round_stats(&self) {
        if let Some(header) = &self.header {
            info!("{}", header);
        }

        info!("Logged ticks: {}", self.logged_ticks.len());

        self.values_to_log.iter().for_each(|value| {
            // Dropped ticks carry no timing stats and are left out of the
            // averages.
            let ticks_with_value: Vec<_> = self
                .logged_ticks
                .iter()
                .filter(|tick| tick.has(value))
                .collect();

            if ticks_with_value.is_empty() {
                return;
            }

            let average = ticks_with_value
                .iter()
                .map(|tick| tick.get(value))
                .sum::<u128>()
                / ticks_with_value.len() as u128;

            info!("Average {}: {}", value, average);
        });
    }

    fn reset_round(&mut self) {
        self.logged_ticks.clear();
        self.current_round_start = Instant::now();
    }
}

impl TickProfiler for ConsoleAverageStatsLogger {
    fn log_tick(&mut self, tick_data: &TickData) {
        self.logged_ticks.push(tick_data.clone_without_image());

        if self.current_round_start.elapsed().gt(&self.round_duration) {
            self.print_round_stats();
            self.reset_round();
        }
    }
}

/// Counts selected drop reasons per round and logs them to the console.
pub struct ConsoleDropReasonsLogger {
    pub types_to_log: Vec<DropReason>,
    pub round_duration: Duration,

    pub current_round_start: Instant,

    pub logged_ticks: Vec<TickData>,
}

impl Default for ConsoleDropReasonsLogger {
    fn default() -> Self {
        Self {
            types_to_log: Vec::new(),
            round_duration: Duration::from_secs(1),
            current_round_start: Instant::now(),
            logged_ticks: Vec::new(),
        }
    }
}

impl ConsoleDropReasonsLogger {
    fn print_round_stats(&self) {
        info!("Dropped ticks");

        self.types_to_log.iter().for_each(|reason| {
            let count = self
                .logged_ticks
                .iter()
                .filter(|tick| tick.get_drop_reason() == Some(*reason))
                .count();

            info!("{}: {}", reason, count);
        });
    }

    fn reset_round(&mut self) {
        self.logged_ticks.clear();
        self.current_round_start = Instant::now();
    }
}

impl TickProfiler for ConsoleDropReasonsLogger {
    fn log_tick(&mut self, tick_data: &TickData) {
        self.logged_ticks.push(tick_data.clone_without_image());

        if self.current_round_start.elapsed().gt(&self.round_duration) {
            self.print_round_stats();
            self.reset_round();
        }
    }
}
