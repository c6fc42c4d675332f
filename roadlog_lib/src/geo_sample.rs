use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// One GPS fix: position, speed over ground, horizontal accuracy and time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    pub position: Point,
    pub speed_mps: f64,
    pub horizontal_accuracy_m: f64,
    pub timestamp: DateTime<Utc>,
}

impl GeoSample {
    /// Negative speeds (some receivers report -1 for "unknown") clamp to 0.
    pub fn new(latitude: f64, longitude: f64, speed_mps: f64, horizontal_accuracy_m: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            position: Point::new(longitude, latitude),
            speed_mps: speed_mps.max(0.0),
            horizontal_accuracy_m,
            timestamp,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    pub fn longitude(&self) -> f64 {
        self.position.x()
    }
}

#[test]
fn negative_speed_clamps_to_zero() {
    let sample = GeoSample::new(56.0, 9.9, -1.0, 5.0, Utc::now());
    assert_eq!(sample.speed_mps, 0.0);
    assert_eq!(sample.latitude(), 56.0);
    assert_eq!(sample.longitude(), 9.9);
}
