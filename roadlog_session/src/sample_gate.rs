use std::time::Duration;

use roadlog_lib::geo_sample::GeoSample;

/// Throttles the raw fix stream down to the accepted track cadence.
/// Bursty high-frequency updates (typically accuracy-degraded) are dropped.
#[derive(Debug, Clone)]
pub struct SampleGate {
    min_interval: Duration,
}

impl SampleGate {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    /// The first sample is accepted unconditionally; later samples only when
    /// spaced at least the minimum interval after the last accepted one.
    pub fn accept(&self, raw: &GeoSample, last_accepted: Option<&GeoSample>) -> bool {
        let Some(last) = last_accepted else {
            return true;
        };

        let elapsed = raw.timestamp.signed_duration_since(last.timestamp);
        elapsed.num_milliseconds() >= self.min_interval.as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn at(seconds: i64) -> GeoSample {
        GeoSample::new(56.0, 9.9, 10.0, 5.0, base() + TimeDelta::seconds(seconds))
    }

    fn at_millis(millis: i64) -> GeoSample {
        GeoSample::new(56.0, 9.9, 10.0, 5.0, base() + TimeDelta::milliseconds(millis))
    }

    #[test]
    fn first_sample_is_always_accepted() {
        let gate = SampleGate::new(Duration::from_secs(2));
        assert!(gate.accept(&at(0), None));
    }

    #[test]
    fn samples_spaced_at_least_the_interval_pass() {
        let gate = SampleGate::new(Duration::from_secs(2));
        let first = at(0);
        assert!(gate.accept(&at(2), Some(&first)));
        assert!(gate.accept(&at(5), Some(&first)));
    }

    #[test]
    fn samples_inside_the_interval_are_rejected() {
        let gate = SampleGate::new(Duration::from_secs(2));
        let first = at_millis(0);
        assert!(!gate.accept(&at_millis(500), Some(&first)));
        assert!(!gate.accept(&at_millis(1999), Some(&first)));
        assert!(gate.accept(&at_millis(2000), Some(&first)));
    }

    #[test]
    fn out_of_order_timestamps_are_rejected() {
        let gate = SampleGate::new(Duration::from_secs(2));
        let first = at(10);
        assert!(!gate.accept(&at(8), Some(&first)));
    }
}
