use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One song from the listening history provider, attached to a route after
/// the trip ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayedTrack {
    pub title: String,
    pub artist: String,
    pub played_at: DateTime<Utc>,
}

impl PlayedTrack {
    pub fn new(title: String, artist: String, played_at: DateTime<Utc>) -> Self {
        Self {
            title,
            artist,
            played_at,
        }
    }
}
