use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use roadlog_lib::{distance, geo_sample::GeoSample, played_track::PlayedTrack, route::RouteSummary};
use roadlog_session::{
    TripEvent, TripSession,
    stores::{ImageStore, ListeningHistoryProvider, RouteStore, StoreError, UploadError},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Console-backed stores for driving the session without a real backend.
struct ConsoleRouteStore;

#[async_trait]
impl RouteStore for ConsoleRouteStore {
    async fn register_route(&self, route_id: &str, user_id: &str) -> Result<(), StoreError> {
        tracing::info!("registered route {} for {}", route_id, user_id);
        Ok(())
    }

    async fn save_route(&self, summary: &RouteSummary) -> Result<(), StoreError> {
        tracing::info!(
            "saved route {}: {:.0} m over {} s, {} images, polyline {:?}",
            summary.route_id,
            summary.distance_meters,
            summary.duration_seconds,
            summary.image_urls.len(),
            summary.polyline,
        );
        Ok(())
    }

    async fn delete_route(&self, route_id: &str) -> Result<(), StoreError> {
        tracing::info!("deleted route {}", route_id);
        Ok(())
    }

    async fn append_image(&self, route_id: &str, url: &str) -> Result<(), StoreError> {
        tracing::info!("appended image {} to route {}", url, route_id);
        Ok(())
    }

    async fn append_listening_history(
        &self,
        route_id: &str,
        tracks: &[PlayedTrack],
    ) -> Result<(), StoreError> {
        tracing::info!("appended {} played tracks to route {}", tracks.len(), route_id);
        Ok(())
    }
}

struct ConsoleImageStore;

#[async_trait]
impl ImageStore for ConsoleImageStore {
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, UploadError> {
        tracing::info!("uploaded {} bytes of {}", bytes.len(), content_type);
        Ok("https://img.example/demo.jpg".into())
    }
}

struct ConsoleHistory;

#[async_trait]
impl ListeningHistoryProvider for ConsoleHistory {
    async fn fetch_played_since(
        &self,
        _user_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<PlayedTrack>, StoreError> {
        Ok(vec![PlayedTrack::new(
            "Road to Nowhere".into(),
            "Talking Heads".into(),
            after + TimeDelta::seconds(30),
        )])
    }
}

/// Drives one synthetic trip through the full session lifecycle.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let session = TripSession::new(
        Arc::new(ConsoleRouteStore),
        Arc::new(ConsoleImageStore),
        Some(Arc::new(ConsoleHistory)),
    );

    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                TripEvent::Movement { state, speed_mps } => {
                    tracing::info!("movement: {:?} at {:.1} mph", state, distance::mps_to_mph(speed_mps));
                }
                TripEvent::Progress { distance_meters, elapsed_seconds } => {
                    tracing::info!(
                        "progress: {:.2} mi after {} s",
                        distance::meters_to_miles(distance_meters),
                        elapsed_seconds
                    );
                }
                TripEvent::ImageAttached { url } => tracing::info!("image attached: {}", url),
                TripEvent::ImageUploadFailed { reason } => tracing::warn!("image upload failed: {}", reason),
            }
        }
    });

    session.start("demo-user").await?;

    // A short straight-line drive north at ~14 m/s, one fix every 2 s.
    let departed = Utc::now();
    for i in 0..10 {
        let sample = GeoSample::new(
            56.0491 + 0.00025 * i as f64,
            9.9218,
            14.0,
            5.0,
            departed + TimeDelta::seconds(2 * i),
        );
        session.record_fix(sample).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    session.upload_and_attach_image(vec![0u8; 2048], "image/jpeg").await?;

    let summary = session.finish("Demo drive", "Synthetic fixes down the motorway").await?;
    tracing::info!(
        "trip done: {:.2} mi, {} track points decoded back",
        distance::meters_to_miles(summary.distance_meters),
        roadlog_lib::route_codec::decode_track(&summary.polyline).len()
    );

    // Give the background enrichment a moment to land before exiting.
    tokio::time::sleep(Duration::from_secs(1)).await;

    Ok(())
}
