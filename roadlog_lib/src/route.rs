use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persistable artifact of one tracked drive, handed to the route store
/// when the trip finishes. Distance is meters, duration is seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub route_id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub distance_meters: f64,
    pub polyline: String,
    pub image_urls: Vec<String>,
}

impl RouteSummary {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        route_id: String,
        user_id: String,
        name: String,
        description: String,
        started_at: DateTime<Utc>,
        duration_seconds: i64,
        distance_meters: f64,
        polyline: String,
        image_urls: Vec<String>,
    ) -> Self {
        Self {
            route_id,
            user_id,
            name,
            description,
            started_at,
            duration_seconds,
            distance_meters,
            polyline,
            image_urls,
        }
    }
}
