//! Cafe Scheduler - Main Entry Point
//! Wires the system clock, the scheduler and the built-in recurring tasks

mod config;
mod tasks;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cafe_core::application::{shutdown_channel, Scheduler};
use cafe_core::port::{Clock, SystemClock};
use config::DaemonConfig;
use tasks::{heartbeat_factory, status_report_factory, HEARTBEAT_TASK, STATUS_REPORT_TASK};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

fn init_logging(log_format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("cafe=info"))?;

    match log_format {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration & logging
    let config = DaemonConfig::parse();
    init_logging(&config.log_format)?;

    info!("Cafe Scheduler v{} (core v{}) starting...", VERSION, cafe_core::VERSION);

    // 2. Setup dependencies (DI wiring)
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = Arc::new(Scheduler::new(clock.clone(), config.scheduler_config()));

    scheduler
        .schedule_recurring(HEARTBEAT_TASK, config.heartbeat_interval(), heartbeat_factory(clock))
        .map_err(|e| anyhow::anyhow!("Registering heartbeat failed: {}", e))?;
    scheduler
        .schedule_recurring(
            STATUS_REPORT_TASK,
            config.status_interval(),
            status_report_factory(Arc::downgrade(&scheduler)),
        )
        .map_err(|e| anyhow::anyhow!("Registering status report failed: {}", e))?;

    // 3. Start the poll loop
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let loop_scheduler = Arc::clone(&scheduler);
    let scheduler_handle = tokio::spawn(async move {
        loop_scheduler.run(shutdown_rx).await;
    });

    info!(
        poll_interval_ms = config.poll_interval_ms,
        tasks = scheduler.task_count(),
        "System ready. Press Ctrl+C to shutdown"
    );

    // 4. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 5. Graceful shutdown
    shutdown_tx.shutdown();
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, scheduler_handle).await.is_err() {
        tracing::warn!("Scheduler did not stop within {:?}", SHUTDOWN_TIMEOUT);
    }

    info!("Shutdown complete.");

    Ok(())
}
