// Recurring Task Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::status::RecurringTaskStatus;
use crate::port::{Clock, ScheduledTaskFactory};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stored state of a recurring task
///
/// "Ready" is deliberately absent: it is computed from the clock on every
/// query, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurringTaskState {
    /// Never run, not paused
    Idle,
    /// Run at least once, waiting for the next interval
    Armed,
    /// Readiness suppressed regardless of timing
    Paused,
}

impl fmt::Display for RecurringTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurringTaskState::Idle => write!(f, "IDLE"),
            RecurringTaskState::Armed => write!(f, "ARMED"),
            RecurringTaskState::Paused => write!(f, "PAUSED"),
        }
    }
}

/// A named job that comes due every `interval`
///
/// The first run is due `interval` after creation, every later run `interval`
/// after the previous one. Missed intervals are not queued: one call to
/// [`RecurringTask::create_scheduled_task`] consumes any backlog and restarts
/// the timeline from "now".
///
/// `T` is the opaque unit of work produced by the factory.
pub struct RecurringTask<T> {
    name: String,
    interval: Duration,
    created: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
    paused: bool,
    clock: Arc<dyn Clock>,
    factory: Arc<dyn ScheduledTaskFactory<T>>,
}

impl<T> RecurringTask<T> {
    /// Create a new recurring task, stamping `created` from the clock
    ///
    /// # Arguments
    ///
    /// * `name` - Identifier used in status reports
    /// * `clock` - Shared time source (injected for determinism)
    /// * `interval` - Time between runs, must be positive
    /// * `factory` - Produces the unit of work each time the task comes due
    pub fn new(
        name: impl Into<String>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        factory: Arc<dyn ScheduledTaskFactory<T>>,
    ) -> Result<Self> {
        let name = name.into();
        if interval <= Duration::zero() {
            return Err(DomainError::Validation(format!(
                "interval for recurring task '{}' must be positive, got {}",
                name, interval
            )));
        }

        let created = clock.now();
        if created.checked_add_signed(interval).is_none() {
            return Err(DomainError::Validation(format!(
                "interval for recurring task '{}' is out of range, got {}",
                name, interval
            )));
        }
        debug!(
            task = %name,
            created = %created,
            interval = %interval,
            "Recurring task created"
        );

        Ok(Self {
            name,
            interval,
            created,
            last_run: None,
            paused: false,
            clock,
            factory,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn state(&self) -> RecurringTaskState {
        match (self.paused, self.last_run) {
            (true, _) => RecurringTaskState::Paused,
            (false, None) => RecurringTaskState::Idle,
            (false, Some(_)) => RecurringTaskState::Armed,
        }
    }

    /// Instant the next run comes due (ignores pause)
    ///
    /// Saturates at the latest representable instant when the sum overflows.
    pub fn expected_next_run(&self) -> DateTime<Utc> {
        self.next_run().unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// None when the next run lies beyond the representable range (never due)
    fn next_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
            .unwrap_or(self.created)
            .checked_add_signed(self.interval)
    }

    /// True when not paused and `now >= reference + interval` (inclusive)
    pub fn is_ready_to_run(&self) -> bool {
        self.is_ready_at(self.clock.now())
    }

    fn is_ready_at(&self, now: DateTime<Utc>) -> bool {
        if self.paused {
            debug!(task = %self.name, "Recurring task not ready: paused");
            return false;
        }
        self.next_run().is_some_and(|next_run| now >= next_run)
    }

    /// Produce the unit of work for the current due interval
    ///
    /// Fails with [`DomainError::InvalidOperation`] when the task is not ready;
    /// in that case nothing is mutated and the factory is not invoked.
    /// On success `last_run` is stamped with the clock reading taken for the
    /// guard, so the check and the stamp agree.
    pub fn create_scheduled_task(&mut self) -> Result<T> {
        let now = self.clock.now();
        if !self.is_ready_at(now) {
            warn!(
                task = %self.name,
                paused = self.paused,
                expected_next_run = %self.expected_next_run(),
                now = %now,
                "Scheduled task requested before recurring task was ready"
            );
            return Err(DomainError::InvalidOperation(format!(
                "recurring task '{}' is not ready to run (state: {}, next run: {})",
                self.name,
                self.state(),
                self.expected_next_run()
            )));
        }

        let scheduled = self.factory.create();
        self.last_run = Some(now);

        info!(
            task = %self.name,
            last_run = %now,
            next_run = %self.expected_next_run(),
            "Scheduled task created"
        );
        Ok(scheduled)
    }

    /// Check readiness and create in one step
    ///
    /// Exclusive access makes the pair atomic: two callers can never both
    /// observe the same due interval. Returns `None` when not ready.
    pub fn poll(&mut self) -> Option<T> {
        if !self.is_ready_to_run() {
            return None;
        }
        self.create_scheduled_task().ok()
    }

    /// Suppress readiness until [`RecurringTask::resume`] (idempotent)
    pub fn pause(&mut self) {
        if !self.paused {
            info!(task = %self.name, "Recurring task paused");
        }
        self.paused = true;
    }

    /// Lift a pause (idempotent)
    ///
    /// The timeline is not shifted: an overdue task is ready immediately.
    pub fn resume(&mut self) {
        if self.paused {
            info!(task = %self.name, "Recurring task resumed");
        }
        self.paused = false;
    }

    /// Snapshot for reporting; never mutates the task
    pub fn to_status(&self) -> RecurringTaskStatus {
        RecurringTaskStatus {
            name: self.name.clone(),
            created: self.created,
            last_run: self.last_run,
            expected_next_run: self.expected_next_run(),
            is_paused: self.paused,
        }
    }
}

impl<T> fmt::Debug for RecurringTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecurringTask")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("created", &self.created)
            .field("last_run", &self.last_run)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}
