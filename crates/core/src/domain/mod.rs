// Domain Layer - Pure business logic and entities

pub mod error;
pub mod recurring_task;
pub mod status;

// Re-exports
pub use error::DomainError;
pub use recurring_task::{RecurringTask, RecurringTaskState};
pub use status::RecurringTaskStatus;
