// Scheduler constants (no magic values)
use std::time::Duration;

/// How often the scheduler polls its recurring tasks (1s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lower bound applied to configured poll intervals (1ms)
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
