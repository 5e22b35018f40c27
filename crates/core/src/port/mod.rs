// Port Layer - Interfaces for external dependencies

pub mod clock; // For deterministic testing
pub mod scheduled_task;

// Re-exports
pub use clock::{Clock, SystemClock};
pub use scheduled_task::{BoxedScheduledTask, ScheduledTask, ScheduledTaskFactory};
