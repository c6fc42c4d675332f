use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roadlog_lib::{played_track::PlayedTrack, route::RouteSummary};

/// Failure from the route document store.
#[derive(Debug)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Failure from the image object store.
#[derive(Debug)]
pub struct UploadError(pub String);

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for UploadError {}

/// Document store holding route records. Consumed by the session, never
/// implemented in this workspace.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Pre-register an empty route record so photos can attach to it
    /// before the trip ends.
    async fn register_route(&self, route_id: &str, user_id: &str) -> Result<(), StoreError>;

    async fn save_route(&self, summary: &RouteSummary) -> Result<(), StoreError>;

    async fn delete_route(&self, route_id: &str) -> Result<(), StoreError>;

    async fn append_image(&self, route_id: &str, url: &str) -> Result<(), StoreError>;

    async fn append_listening_history(
        &self,
        route_id: &str,
        tracks: &[PlayedTrack],
    ) -> Result<(), StoreError>;
}

/// Object store for trip photos.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload raw image bytes, returning the public URL.
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, UploadError>;
}

/// Third-party music history, queried once per finished trip.
#[async_trait]
pub trait ListeningHistoryProvider: Send + Sync {
    async fn fetch_played_since(
        &self,
        user_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<PlayedTrack>, StoreError>;
}
