// Application Layer - Use Cases and orchestration

pub mod scheduler;

// Re-exports
pub use scheduler::{
    shutdown_channel, Scheduler, SchedulerConfig, SchedulerStatus, ShutdownSender, ShutdownToken,
};
