//! Daemon configuration (flags with environment fallbacks)

use cafe_core::application::SchedulerConfig;
use clap::Parser;

/// Upper bound for poll intervals (one day)
const MAX_POLL_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// Upper bound for recurring task intervals (ten years)
const MAX_INTERVAL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Parser, Debug, Clone)]
#[command(name = "cafe-scheduler")]
#[command(about = "Cafe recurring task scheduler", long_about = None)]
#[command(version)]
pub struct DaemonConfig {
    /// How often the scheduler polls its recurring tasks (milliseconds)
    #[arg(
        long,
        env = "CAFE_POLL_INTERVAL_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..=MAX_POLL_INTERVAL_MS)
    )]
    pub poll_interval_ms: u64,

    /// Interval of the built-in heartbeat task (seconds)
    #[arg(
        long,
        env = "CAFE_HEARTBEAT_INTERVAL_SECS",
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_SECS)
    )]
    pub heartbeat_interval_secs: u64,

    /// How often the scheduler status is logged (seconds)
    #[arg(
        long,
        env = "CAFE_STATUS_INTERVAL_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_SECS)
    )]
    pub status_interval_secs: u64,

    /// Log output: "json" or "pretty"
    #[arg(long, env = "CAFE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

impl DaemonConfig {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: std::time::Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn heartbeat_interval(&self) -> chrono::Duration {
        interval_from_secs(self.heartbeat_interval_secs)
    }

    pub fn status_interval(&self) -> chrono::Duration {
        interval_from_secs(self.status_interval_secs)
    }
}

// Parsing caps seconds at MAX_INTERVAL_SECS, far inside both i64 and TimeDelta range
fn interval_from_secs(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_INTERVAL_SECS) as i64)
}
