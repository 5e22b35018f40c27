//! Built-in recurring work registered by the daemon

use async_trait::async_trait;
use cafe_core::application::Scheduler;
use cafe_core::port::{BoxedScheduledTask, Clock, ScheduledTask, ScheduledTaskFactory};
use cafe_core::{AppError, Result};
use std::sync::{Arc, Weak};
use tracing::info;

pub const HEARTBEAT_TASK: &str = "heartbeat";
pub const STATUS_REPORT_TASK: &str = "status-report";

/// Logs that the daemon is alive
pub struct HeartbeatTask {
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl ScheduledTask for HeartbeatTask {
    fn description(&self) -> String {
        HEARTBEAT_TASK.to_string()
    }

    async fn run(&self) -> Result<()> {
        info!(at = %self.clock.now(), "Heartbeat");
        Ok(())
    }
}

pub fn heartbeat_factory(
    clock: Arc<dyn Clock>,
) -> Arc<dyn ScheduledTaskFactory<BoxedScheduledTask>> {
    Arc::new(move || {
        Box::new(HeartbeatTask {
            clock: Arc::clone(&clock),
        }) as BoxedScheduledTask
    })
}

/// Logs the scheduler status as JSON
///
/// Holds a weak reference: the scheduler owns the factory that creates this task.
pub struct StatusReportTask {
    scheduler: Weak<Scheduler>,
}

impl StatusReportTask {
    fn render(&self) -> Result<String> {
        let scheduler = self.scheduler.upgrade().ok_or_else(|| {
            AppError::Internal("scheduler dropped before status report".to_string())
        })?;
        serde_json::to_string(&scheduler.status())
            .map_err(|e| AppError::Internal(format!("status serialization failed: {}", e)))
    }
}

#[async_trait]
impl ScheduledTask for StatusReportTask {
    fn description(&self) -> String {
        STATUS_REPORT_TASK.to_string()
    }

    async fn run(&self) -> Result<()> {
        let status = self.render()?;
        info!(status = %status, "Scheduler status");
        Ok(())
    }
}

pub fn status_report_factory(
    scheduler: Weak<Scheduler>,
) -> Arc<dyn ScheduledTaskFactory<BoxedScheduledTask>> {
    Arc::new(move || {
        Box::new(StatusReportTask {
            scheduler: Weak::clone(&scheduler),
        }) as BoxedScheduledTask
    })
}
