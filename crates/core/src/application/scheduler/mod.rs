//! Scheduler - Registry of recurring tasks polled on a fixed tick
//!
//! Each tick asks every recurring task whether it is due, collects the units
//! of work the due tasks produce and spawns them on the tokio runtime.
//! Readiness and creation happen under one lock, so a due interval yields
//! exactly one unit of work.

pub mod constants;
mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::domain::{DomainError, RecurringTask, RecurringTaskStatus};
use crate::port::{BoxedScheduledTask, Clock, ScheduledTaskFactory};
use chrono::Duration;
use constants::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between two polls of the registry
    pub poll_interval: std::time::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Scheduler-wide snapshot for operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    /// False while the whole scheduler is paused
    pub is_running: bool,
    /// Ordered by task name
    pub recurring_tasks: Vec<RecurringTaskStatus>,
}

struct SchedulerState {
    is_running: bool,
    tasks: BTreeMap<String, RecurringTask<BoxedScheduledTask>>,
}

/// Scheduler owns the recurring tasks and hands due work to tokio
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config,
            state: Mutex::new(SchedulerState {
                is_running: true,
                tasks: BTreeMap::new(),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        // RecurringTask mutations are single assignments, poisoning leaves no partial state
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an already-built recurring task
    ///
    /// Names are unique within a scheduler.
    pub fn add_recurring_task(
        &self,
        task: RecurringTask<BoxedScheduledTask>,
    ) -> crate::domain::error::Result<()> {
        let mut state = self.lock_state();
        if state.tasks.contains_key(task.name()) {
            return Err(DomainError::Validation(format!(
                "recurring task '{}' is already registered",
                task.name()
            )));
        }

        info!(
            task = %task.name(),
            interval = %task.interval(),
            expected_next_run = %task.expected_next_run(),
            "Registered recurring task"
        );
        state.tasks.insert(task.name().to_string(), task);
        Ok(())
    }

    /// Build a recurring task on the scheduler's clock and register it
    pub fn schedule_recurring(
        &self,
        name: impl Into<String>,
        interval: Duration,
        factory: Arc<dyn ScheduledTaskFactory<BoxedScheduledTask>>,
    ) -> crate::domain::error::Result<()> {
        let task = RecurringTask::new(name, Arc::clone(&self.clock), interval, factory)?;
        self.add_recurring_task(task)
    }

    pub fn task_count(&self) -> usize {
        self.lock_state().tasks.len()
    }

    /// Collect one unit of work from every due recurring task
    ///
    /// A factory that panics is logged and skipped for this poll; its task is
    /// left untouched and comes due again on the next poll.
    pub fn poll(&self) -> Vec<BoxedScheduledTask> {
        let mut state = self.lock_state();
        if !state.is_running {
            debug!("Scheduler paused, skipping poll");
            return Vec::new();
        }

        state
            .tasks
            .values_mut()
            .filter_map(poll_guarded)
            .collect()
    }

    /// Poll and spawn every produced unit of work
    ///
    /// Must be called from within a tokio runtime. The returned handles finish
    /// once the unit has run; its outcome is logged, never propagated.
    pub fn dispatch_due_tasks(&self) -> Vec<JoinHandle<()>> {
        self.poll().into_iter().map(spawn_scheduled_task).collect()
    }

    /// Suppress all production until [`Scheduler::resume`]
    ///
    /// Per-task pause flags are left as they are.
    pub fn pause(&self) {
        let mut state = self.lock_state();
        if state.is_running {
            info!("Scheduler paused");
        }
        state.is_running = false;
    }

    pub fn resume(&self) {
        let mut state = self.lock_state();
        if !state.is_running {
            info!("Scheduler resumed");
        }
        state.is_running = true;
    }

    pub fn pause_task(&self, name: &str) -> crate::domain::error::Result<()> {
        self.with_task(name, RecurringTask::pause)
    }

    pub fn resume_task(&self, name: &str) -> crate::domain::error::Result<()> {
        self.with_task(name, RecurringTask::resume)
    }

    fn with_task(
        &self,
        name: &str,
        f: impl FnOnce(&mut RecurringTask<BoxedScheduledTask>),
    ) -> crate::domain::error::Result<()> {
        let mut state = self.lock_state();
        let task = state
            .tasks
            .get_mut(name)
            .ok_or_else(|| DomainError::TaskNotFound(name.to_string()))?;
        f(task);
        Ok(())
    }

    pub fn task_status(&self, name: &str) -> crate::domain::error::Result<RecurringTaskStatus> {
        self.lock_state()
            .tasks
            .get(name)
            .map(RecurringTask::to_status)
            .ok_or_else(|| DomainError::TaskNotFound(name.to_string()))
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.lock_state();
        SchedulerStatus {
            is_running: state.is_running,
            recurring_tasks: state.tasks.values().map(RecurringTask::to_status).collect(),
        }
    }

    /// Run the poll loop until `shutdown` fires
    ///
    /// Spawned units of work are not awaited on shutdown; their execution
    /// belongs to the runtime.
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            tasks = self.task_count(),
            "Scheduler started"
        );

        // tokio rejects a zero period
        let period = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if shutdown.is_shutdown() {
                break;
            }
            tokio::select! {
                _ = tick.tick() => {
                    let dispatched = self.dispatch_due_tasks().len();
                    if dispatched > 0 {
                        debug!(dispatched = dispatched, "Dispatched due scheduled tasks");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Scheduler interrupted while waiting for next tick");
                    break;
                }
            }
        }

        info!("Scheduler stopped");
    }
}

/// Poll one recurring task, containing a panicking factory
///
/// `create_scheduled_task` invokes the factory before stamping `last_run`, so
/// an unwind leaves the task exactly as it was.
fn poll_guarded(task: &mut RecurringTask<BoxedScheduledTask>) -> Option<BoxedScheduledTask> {
    match catch_unwind(AssertUnwindSafe(|| task.poll())) {
        Ok(produced) => produced,
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            error!(
                task = %task.name(),
                panic_msg = %panic_msg,
                "Scheduled task factory panicked"
            );
            None
        }
    }
}

/// Run a unit of work on its own task so a panic cannot reach the poll loop
fn spawn_scheduled_task(task: BoxedScheduledTask) -> JoinHandle<()> {
    let description = task.description();
    tokio::spawn(async move {
        let handle = tokio::spawn(async move { task.run().await });
        match handle.await {
            Ok(Ok(())) => info!(task = %description, "Scheduled task completed"),
            Ok(Err(e)) => error!(task = %description, error = %e, "Scheduled task failed"),
            Err(join_err) if join_err.is_panic() => {
                error!(task = %description, "Scheduled task panicked: {:?}", join_err)
            }
            Err(join_err) => {
                error!(task = %description, "Scheduled task cancelled: {:?}", join_err)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::port::clock::mocks::FakeClock;
    use crate::port::ScheduledTask;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTask {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ScheduledTask for CountingTask {
        fn description(&self) -> String {
            "counting".to_string()
        }

        async fn run(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Execution("boom".to_string()));
            }
            Ok(())
        }
    }

    struct PanickingTask;

    #[async_trait]
    impl ScheduledTask for PanickingTask {
        fn description(&self) -> String {
            "panicking".to_string()
        }

        async fn run(&self) -> Result<()> {
            panic!("scheduled task blew up");
        }
    }

    fn counting_factory(
        runs: Arc<AtomicUsize>,
        fail: bool,
    ) -> Arc<dyn ScheduledTaskFactory<BoxedScheduledTask>> {
        Arc::new(move || {
            Box::new(CountingTask {
                runs: Arc::clone(&runs),
                fail,
            }) as BoxedScheduledTask
        })
    }

    fn scheduler_with_clock() -> (Scheduler, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock::new());
        let scheduler = Scheduler::new(clock.clone(), SchedulerConfig::default());
        (scheduler, clock)
    }

    #[test]
    fn test_poll_produces_only_due_tasks() {
        let (scheduler, clock) = scheduler_with_clock();
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler
            .schedule_recurring("fast", Duration::minutes(1), counting_factory(runs.clone(), false))
            .unwrap();
        scheduler
            .schedule_recurring(
                "slow",
                Duration::minutes(10),
                counting_factory(runs.clone(), false),
            )
            .unwrap();

        assert!(scheduler.poll().is_empty());

        clock.advance(Duration::minutes(1));
        assert_eq!(scheduler.poll().len(), 1);
        assert!(scheduler.poll().is_empty(), "same interval must not produce twice");

        clock.advance(Duration::minutes(9));
        assert_eq!(scheduler.poll().len(), 2);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (scheduler, _) = scheduler_with_clock();
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler
            .schedule_recurring("dup", Duration::minutes(1), counting_factory(runs.clone(), false))
            .unwrap();

        let result = scheduler.schedule_recurring(
            "dup",
            Duration::minutes(2),
            counting_factory(runs, false),
        );

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(scheduler.task_count(), 1);
    }

    #[test]
    fn test_scheduler_pause_keeps_task_flags() {
        let (scheduler, clock) = scheduler_with_clock();
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler
            .schedule_recurring("a", Duration::minutes(1), counting_factory(runs.clone(), false))
            .unwrap();
        scheduler
            .schedule_recurring("b", Duration::minutes(1), counting_factory(runs, false))
            .unwrap();
        scheduler.pause_task("b").unwrap();
        clock.advance(Duration::minutes(1));

        scheduler.pause();
        assert!(scheduler.poll().is_empty());
        assert!(!scheduler.status().is_running);

        scheduler.resume();
        assert_eq!(scheduler.poll().len(), 1);
        assert!(scheduler.task_status("b").unwrap().is_paused);
    }

    #[test]
    fn test_unknown_task_is_not_found() {
        let (scheduler, _) = scheduler_with_clock();

        assert_eq!(
            scheduler.pause_task("missing"),
            Err(DomainError::TaskNotFound("missing".to_string()))
        );
        assert!(matches!(
            scheduler.resume_task("missing"),
            Err(DomainError::TaskNotFound(_))
        ));
        assert!(scheduler.task_status("missing").is_err());
    }

    #[test]
    fn test_status_is_ordered_by_name() {
        let (scheduler, _) = scheduler_with_clock();
        let runs = Arc::new(AtomicUsize::new(0));
        for name in ["zeta", "alpha", "mid"] {
            scheduler
                .schedule_recurring(
                    name,
                    Duration::minutes(1),
                    counting_factory(runs.clone(), false),
                )
                .unwrap();
        }

        let names: Vec<_> = scheduler
            .status()
            .recurring_tasks
            .into_iter()
            .map(|s| s.name)
            .collect();

        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_dispatch_runs_units_and_survives_failures() {
        let (scheduler, clock) = scheduler_with_clock();
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler
            .schedule_recurring("ok", Duration::minutes(1), counting_factory(runs.clone(), false))
            .unwrap();
        scheduler
            .schedule_recurring(
                "failing",
                Duration::minutes(1),
                counting_factory(runs.clone(), true),
            )
            .unwrap();
        scheduler
            .schedule_recurring(
                "panicking",
                Duration::minutes(1),
                Arc::new(|| Box::new(PanickingTask) as BoxedScheduledTask),
            )
            .unwrap();
        clock.advance(Duration::minutes(1));

        let handles = scheduler.dispatch_due_tasks();
        assert_eq!(handles.len(), 3);
        for handle in handles {
            tokio_test::assert_ok!(handle.await);
        }

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(scheduler
            .status()
            .recurring_tasks
            .iter()
            .all(|s| s.last_run == Some(clock.now())));
    }

    #[test]
    fn test_panicking_factory_does_not_break_poll() {
        let (scheduler, clock) = scheduler_with_clock();
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler
            .schedule_recurring(
                "broken",
                Duration::minutes(1),
                Arc::new(|| -> BoxedScheduledTask { panic!("factory blew up") }),
            )
            .unwrap();
        scheduler
            .schedule_recurring("healthy", Duration::minutes(1), counting_factory(runs, false))
            .unwrap();
        clock.advance(Duration::minutes(1));

        assert_eq!(scheduler.poll().len(), 1, "healthy task still produces");

        let broken = scheduler.task_status("broken").unwrap();
        assert!(broken.last_run.is_none(), "no state change on panic");
        assert!(scheduler.task_status("healthy").unwrap().last_run.is_some());
        assert_eq!(scheduler.poll().len(), 0, "broken task is retried, healthy is not due");
    }

    #[tokio::test]
    async fn test_run_loop_survives_panicking_factory() {
        let clock = Arc::new(FakeClock::new());
        let config = SchedulerConfig {
            poll_interval: std::time::Duration::from_millis(5),
        };
        let scheduler = Arc::new(Scheduler::new(clock.clone(), config));
        scheduler
            .schedule_recurring(
                "broken",
                Duration::minutes(1),
                Arc::new(|| -> BoxedScheduledTask { panic!("factory blew up") }),
            )
            .unwrap();
        clock.advance(Duration::minutes(1));

        let (tx, token) = shutdown_channel();
        let loop_scheduler = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { loop_scheduler.run(token).await });

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(!handle.is_finished(), "poll loop keeps running");

        tx.shutdown();
        tokio_test::assert_ok!(handle.await);
    }

    #[tokio::test]
    async fn test_run_dispatches_and_stops_on_shutdown() {
        let clock = Arc::new(FakeClock::new());
        let config = SchedulerConfig {
            poll_interval: std::time::Duration::from_millis(5),
        };
        let scheduler = Arc::new(Scheduler::new(clock.clone(), config));
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler
            .schedule_recurring("tick", Duration::minutes(1), counting_factory(runs.clone(), false))
            .unwrap();
        clock.advance(Duration::minutes(1));

        let (tx, token) = shutdown_channel();
        let loop_scheduler = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { loop_scheduler.run(token).await });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.shutdown();
        tokio_test::assert_ok!(handle.await);

        assert!(scheduler.task_status("tick").unwrap().last_run.is_some());
        assert!(scheduler.poll().is_empty(), "clock did not move, nothing new is due");
    }
}
