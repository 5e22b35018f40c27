// Scheduled Task ports
// reason: async-trait for the runnable unit (scheduler spawns it on tokio)

use crate::error::Result;
use async_trait::async_trait;

/// Produces a fresh unit of work each time a recurring task comes due
///
/// The recurring task never inspects what it gets back; the value is handed to
/// the caller of `create_scheduled_task` unchanged. Any `Fn() -> T` closure is
/// a factory.
pub trait ScheduledTaskFactory<T>: Send + Sync {
    fn create(&self) -> T;
}

impl<T, F> ScheduledTaskFactory<T> for F
where
    F: Fn() -> T + Send + Sync,
{
    fn create(&self) -> T {
        self()
    }
}

/// Runnable unit of work executed by the [`Scheduler`](crate::application::Scheduler)
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Short human-readable label used in logs
    fn description(&self) -> String;

    /// Execute the work
    ///
    /// Errors are logged by the scheduler; they never affect the recurring
    /// task that produced this unit.
    async fn run(&self) -> Result<()>;
}

/// Unit of work as stored and dispatched by the scheduler
pub type BoxedScheduledTask = Box<dyn ScheduledTask>;
