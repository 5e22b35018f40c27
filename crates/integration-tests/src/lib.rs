//! Shared fixtures for the definition-of-done suites

use async_trait::async_trait;
use cafe_core::port::clock::mocks::FakeClock;
use cafe_core::port::{BoxedScheduledTask, Clock, ScheduledTask, ScheduledTaskFactory};
use cafe_core::Result;
use chrono::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn five_minutes() -> Duration {
    Duration::minutes(5)
}

/// Clock shared between a test and the tasks it drives
pub fn fake_clock() -> (Arc<FakeClock>, Arc<dyn Clock>) {
    let clock = Arc::new(FakeClock::new());
    let shared: Arc<dyn Clock> = clock.clone();
    (clock, shared)
}

/// Unit of work that records how many times it has run
pub struct RecordingTask {
    pub id: usize,
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl ScheduledTask for RecordingTask {
    fn description(&self) -> String {
        format!("recording-{}", self.id)
    }

    async fn run(&self) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory producing numbered [`RecordingTask`]s; also returns the run counter
pub fn recording_factory() -> (
    Arc<dyn ScheduledTaskFactory<BoxedScheduledTask>>,
    Arc<AtomicUsize>,
) {
    let runs = Arc::new(AtomicUsize::new(0));
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let factory: Arc<dyn ScheduledTaskFactory<BoxedScheduledTask>> = Arc::new(move || {
        Box::new(RecordingTask {
            id: created.fetch_add(1, Ordering::SeqCst) + 1,
            runs: Arc::clone(&counter),
        }) as BoxedScheduledTask
    });
    (factory, runs)
}
