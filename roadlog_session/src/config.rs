use std::time::Duration;

/// Tunables for sample gating, stop detection and the image upload path.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Minimum spacing between accepted samples.
    pub min_sample_interval: Duration,
    /// Below this ground speed a sample counts as slow.
    pub slow_speed_mps: f64,
    /// Fixes with worse horizontal accuracy are treated as unknown and
    /// never drive a movement transition on their own.
    pub accuracy_bound_m: f64,
    /// How long slow samples must persist before Stopped commits.
    pub stop_confirm: Duration,
    /// Movement evaluation cadence, independent of fix arrival.
    pub eval_tick: Duration,
    /// Image upload attempts before giving up.
    pub upload_attempts: u32,
    /// Delay before the first upload retry; doubles on each attempt.
    pub upload_backoff: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_sample_interval: Duration::from_secs(2),
            slow_speed_mps: 1.34, // ~3 mph
            accuracy_bound_m: 20.0,
            stop_confirm: Duration::from_secs(8),
            eval_tick: Duration::from_secs(2),
            upload_attempts: 4,
            upload_backoff: Duration::from_secs(1),
        }
    }
}
