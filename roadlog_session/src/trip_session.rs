use std::sync::Arc;

use chrono::{DateTime, Utc};
use roadlog_lib::{
    distance::DistanceAccumulator, geo_sample::GeoSample, route::RouteSummary, route_codec,
};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Mutex, broadcast},
    task::JoinHandle,
};

use crate::{
    SessionError,
    config::SessionConfig,
    sample_gate::SampleGate,
    stop_detector::{MovementState, StopDetector, TickOutcome},
    stores::{ImageStore, ListeningHistoryProvider, RouteStore, UploadError},
};

/// Trip lifecycle. Finished and Cancelled are terminal; a terminal session
/// accepts no further fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripState {
    Idle,
    Tracking,
    Finished,
    Cancelled,
}

/// Discrete notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TripEvent {
    /// Fired on every committed movement transition.
    Movement { state: MovementState, speed_mps: f64 },
    /// Fired on every accepted fix.
    Progress { distance_meters: f64, elapsed_seconds: i64 },
    ImageAttached { url: String },
    ImageUploadFailed { reason: String },
}

/// Copy-out view of the live session. Never hands out references into the
/// session's own state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSnapshot {
    pub state: TripState,
    pub route_id: Option<String>,
    pub distance_meters: f64,
    pub elapsed_seconds: i64,
    pub movement: MovementState,
    pub speed_mps: f64,
}

struct SessionInner {
    state: TripState,
    route_id: Option<String>,
    user_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    track: Vec<GeoSample>,
    distance: DistanceAccumulator,
    detector: StopDetector,
    latest_sample: Option<GeoSample>,
    image_urls: Vec<String>,
    last_summary: Option<RouteSummary>,
    ticker: Option<JoinHandle<()>>,
    confirm: Option<JoinHandle<()>>,
}

impl SessionInner {
    fn elapsed_seconds(&self) -> i64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.signed_duration_since(start).num_seconds(),
            (Some(start), None) => Utc::now().signed_duration_since(start).num_seconds(),
            _ => 0,
        }
    }

    fn stop_timers(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        if let Some(handle) = self.confirm.take() {
            handle.abort();
        }
    }
}

/// One tracked drive from `start()` to `finish()`/`cancel()`.
///
/// Every mutating operation funnels through a single mutex, so asynchronous
/// fix delivery and user actions never interleave into a torn read of the
/// track or distance. Handles are cheap clones sharing the same session.
#[derive(Clone)]
pub struct TripSession {
    inner: Arc<Mutex<SessionInner>>,
    events: broadcast::Sender<TripEvent>,
    config: SessionConfig,
    gate: SampleGate,
    route_store: Arc<dyn RouteStore>,
    image_store: Arc<dyn ImageStore>,
    history: Option<Arc<dyn ListeningHistoryProvider>>,
}

impl TripSession {
    pub fn new(
        route_store: Arc<dyn RouteStore>,
        image_store: Arc<dyn ImageStore>,
        history: Option<Arc<dyn ListeningHistoryProvider>>,
    ) -> Self {
        Self::with_config(SessionConfig::default(), route_store, image_store, history)
    }

    pub fn with_config(
        config: SessionConfig,
        route_store: Arc<dyn RouteStore>,
        image_store: Arc<dyn ImageStore>,
        history: Option<Arc<dyn ListeningHistoryProvider>>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        let inner = SessionInner {
            state: TripState::Idle,
            route_id: None,
            user_id: None,
            started_at: None,
            ended_at: None,
            track: Vec::new(),
            distance: DistanceAccumulator::new(),
            detector: StopDetector::new(config.slow_speed_mps, config.accuracy_bound_m),
            latest_sample: None,
            image_urls: Vec::new(),
            last_summary: None,
            ticker: None,
            confirm: None,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            events,
            gate: SampleGate::new(config.min_sample_interval),
            config,
            route_store,
            image_store,
            history,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TripEvent> {
        self.events.subscribe()
    }

    /// Begin a new trip. Fails if one is already being tracked.
    ///
    /// The route is pre-registered with the store so photos taken during the
    /// drive can attach before the trip ends. A failed registration is
    /// reported but leaves the session tracking; the summary remains
    /// available at finish for a manual retry.
    pub async fn start(&self, user_id: &str) -> Result<String, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state == TripState::Tracking {
            return Err(SessionError::InvalidState("start() while already tracking".into()));
        }

        let route_id = hex::encode(rand::random::<[u8; 8]>());

        inner.state = TripState::Tracking;
        inner.route_id = Some(route_id.clone());
        inner.user_id = Some(user_id.to_string());
        inner.started_at = Some(Utc::now());
        inner.ended_at = None;
        inner.track.clear();
        inner.distance.reset();
        inner.detector.reset();
        inner.latest_sample = None;
        inner.image_urls.clear();
        inner.last_summary = None;
        inner.ticker = Some(self.spawn_ticker());

        tracing::info!("Started tracking route {} for user {}", route_id, user_id);

        if let Err(err) = self.route_store.register_route(&route_id, user_id).await {
            tracing::error!("Failed to register route {}: {}", route_id, err);
            return Err(SessionError::Persistence(format!("route registration failed: {err}")));
        }

        Ok(route_id)
    }

    /// Feed one raw GPS fix. A no-op outside Tracking and for fixes the
    /// gate rejects.
    pub async fn record_fix(&self, raw: GeoSample) {
        let mut inner = self.inner.lock().await;
        if inner.state != TripState::Tracking {
            return;
        }
        if !self.gate.accept(&raw, inner.track.last()) {
            return;
        }

        if let Some(last) = inner.track.last().copied() {
            inner.distance.add_segment(&last, &raw);
        }
        inner.track.push(raw);
        inner.latest_sample = Some(raw);

        let distance_meters = inner.distance.total_meters();
        let elapsed_seconds = inner.elapsed_seconds();
        drop(inner);

        let _ = self.events.send(TripEvent::Progress { distance_meters, elapsed_seconds });
    }

    /// End the trip and persist the final summary.
    ///
    /// The encoded summary stays available through [`TripSession::last_summary`]
    /// even when the save fails, so the caller can prompt a retry. The
    /// listening-history enrichment runs in the background and never blocks
    /// this call.
    pub async fn finish(&self, name: &str, description: &str) -> Result<RouteSummary, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state != TripState::Tracking {
            return Err(SessionError::InvalidState(format!("finish() while {:?}", inner.state)));
        }

        inner.state = TripState::Finished;
        inner.ended_at = Some(Utc::now());
        inner.stop_timers();

        let summary = RouteSummary::new(
            inner.route_id.clone().unwrap_or_default(),
            inner.user_id.clone().unwrap_or_default(),
            name.to_string(),
            description.to_string(),
            inner.started_at.unwrap_or_else(Utc::now),
            inner.elapsed_seconds(),
            inner.distance.total_meters(),
            route_codec::encode_track(&inner.track),
            inner.image_urls.clone(),
        );
        inner.last_summary = Some(summary.clone());
        drop(inner);

        tracing::info!(
            "Finishing route {}: {:.0} m over {} s",
            summary.route_id,
            summary.distance_meters,
            summary.duration_seconds
        );

        let save_result = self.route_store.save_route(&summary).await;
        self.spawn_history_enrichment(&summary);

        match save_result {
            Ok(()) => Ok(summary),
            Err(err) => {
                tracing::error!("Failed to save route {}: {}", summary.route_id, err);
                Err(SessionError::Persistence(format!("route save failed: {err}")))
            }
        }
    }

    /// Abandon the trip and delete its store record.
    ///
    /// Cancellation is final at the session layer: a failed delete is
    /// reported but never rolls the state back, and retrying the delete is
    /// the caller's concern.
    pub async fn cancel(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state != TripState::Tracking {
            return Err(SessionError::InvalidState(format!("cancel() while {:?}", inner.state)));
        }

        inner.state = TripState::Cancelled;
        inner.ended_at = Some(Utc::now());
        inner.stop_timers();
        let route_id = inner.route_id.clone().unwrap_or_default();
        drop(inner);

        tracing::info!("Cancelled route {}", route_id);

        if let Err(err) = self.route_store.delete_route(&route_id).await {
            tracing::error!("Failed to delete cancelled route {}: {}", route_id, err);
            return Err(SessionError::Persistence(format!("route delete failed: {err}")));
        }
        Ok(())
    }

    /// Attach an already-uploaded photo to the current route. Valid while
    /// Tracking or Finished.
    pub async fn attach_image(&self, url: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state != TripState::Tracking && inner.state != TripState::Finished {
            return Err(SessionError::InvalidState(format!("attach_image() while {:?}", inner.state)));
        }

        let route_id = inner.route_id.clone().unwrap_or_default();
        inner.image_urls.push(url.to_string());
        if let Some(summary) = inner.last_summary.as_mut() {
            summary.image_urls.push(url.to_string());
        }
        drop(inner);

        let _ = self.events.send(TripEvent::ImageAttached { url: url.to_string() });

        if let Err(err) = self.route_store.append_image(&route_id, url).await {
            tracing::error!("Failed to append image to route {}: {}", route_id, err);
            return Err(SessionError::Persistence(format!("image append failed: {err}")));
        }
        Ok(())
    }

    /// Upload photo bytes in the background and attach the resulting URL.
    ///
    /// Retries with exponential backoff; after the configured attempts are
    /// exhausted the failure is reported as an [`TripEvent::ImageUploadFailed`]
    /// event and not retried again.
    pub async fn upload_and_attach_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), SessionError> {
        let inner = self.inner.lock().await;
        if inner.state != TripState::Tracking && inner.state != TripState::Finished {
            return Err(SessionError::InvalidState(format!(
                "upload_and_attach_image() while {:?}",
                inner.state
            )));
        }
        let route_id = inner.route_id.clone().unwrap_or_default();
        drop(inner);

        let session = self.clone();
        let content_type = content_type.to_string();
        tokio::spawn(async move {
            match session.upload_with_backoff(&bytes, &content_type).await {
                Ok(url) => {
                    let still_current = {
                        let inner = session.inner.lock().await;
                        inner.route_id.as_deref() == Some(route_id.as_str())
                    };
                    if !still_current {
                        tracing::debug!("Dropping uploaded image for superseded route {}", route_id);
                        return;
                    }
                    if let Err(err) = session.attach_image(&url).await {
                        tracing::error!("Uploaded image could not be attached: {}", err);
                    }
                }
                Err(err) => {
                    tracing::error!("Giving up on image upload for route {}: {}", route_id, err);
                    let _ = session
                        .events
                        .send(TripEvent::ImageUploadFailed { reason: err.to_string() });
                }
            }
        });

        Ok(())
    }

    /// Copy-out view for the presentation layer, readable at any time.
    pub async fn snapshot(&self) -> TripSnapshot {
        let inner = self.inner.lock().await;
        TripSnapshot {
            state: inner.state,
            route_id: inner.route_id.clone(),
            distance_meters: inner.distance.total_meters(),
            elapsed_seconds: inner.elapsed_seconds(),
            movement: inner.detector.movement(),
            speed_mps: inner.latest_sample.map(|s| s.speed_mps).unwrap_or(0.0),
        }
    }

    /// The last computed summary, retained even when its save failed.
    pub async fn last_summary(&self) -> Option<RouteSummary> {
        self.inner.lock().await.last_summary.clone()
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let session = self.clone();
        let period = self.config.eval_tick;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !session.evaluate_movement().await {
                    break;
                }
            }
        })
    }

    /// One movement evaluation tick. Returns false once the session has left
    /// Tracking so the ticker winds down.
    async fn evaluate_movement(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != TripState::Tracking {
            return false;
        }
        let Some(sample) = inner.latest_sample else {
            return true;
        };

        match inner.detector.on_tick(&sample) {
            TickOutcome::Transition(state) => {
                drop(inner);
                tracing::debug!("Movement transition to {:?}", state);
                let _ = self.events.send(TripEvent::Movement { state, speed_mps: sample.speed_mps });
            }
            TickOutcome::BeginStopCandidate(generation) => {
                let handle = self.spawn_confirm(generation);
                if let Some(old) = inner.confirm.replace(handle) {
                    old.abort();
                }
            }
            TickOutcome::Ignore => {}
        }
        true
    }

    fn spawn_confirm(&self, generation: u64) -> JoinHandle<()> {
        let session = self.clone();
        let window = self.config.stop_confirm;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let mut inner = session.inner.lock().await;
            if inner.state != TripState::Tracking {
                return;
            }
            let latest = inner.latest_sample;
            if inner.detector.confirm_stop(generation, latest.as_ref()) {
                drop(inner);
                tracing::debug!("Stop confirmed after debounce window");
                let _ = session.events.send(TripEvent::Movement {
                    state: MovementState::Stopped,
                    speed_mps: latest.map(|s| s.speed_mps).unwrap_or(0.0),
                });
            }
        })
    }

    async fn upload_with_backoff(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, UploadError> {
        let mut delay = self.config.upload_backoff;
        let mut attempt = 1;
        loop {
            match self.image_store.upload(bytes, content_type).await {
                Ok(url) => return Ok(url),
                Err(err) if attempt < self.config.upload_attempts => {
                    tracing::warn!(
                        "Image upload attempt {} failed, retrying in {:?}: {}",
                        attempt,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fire-and-forget music enrichment. Appended to the already-saved
    /// record; results for a superseded route are dropped, since that route
    /// is no longer mutable.
    fn spawn_history_enrichment(&self, summary: &RouteSummary) {
        let Some(provider) = self.history.clone() else {
            return;
        };
        let session = self.clone();
        let route_id = summary.route_id.clone();
        let user_id = summary.user_id.clone();
        let started_at = summary.started_at;

        tokio::spawn(async move {
            let tracks = match provider.fetch_played_since(&user_id, started_at).await {
                Ok(tracks) => tracks,
                Err(err) => {
                    tracing::warn!("Listening history fetch failed for route {}: {}", route_id, err);
                    return;
                }
            };
            if tracks.is_empty() {
                return;
            }

            let still_current = {
                let inner = session.inner.lock().await;
                inner.route_id.as_deref() == Some(route_id.as_str())
            };
            if !still_current {
                tracing::debug!("Dropping listening history for superseded route {}", route_id);
                return;
            }

            if let Err(err) = session.route_store.append_listening_history(&route_id, &tracks).await {
                tracing::error!("Failed to append listening history to route {}: {}", route_id, err);
            } else {
                tracing::info!("Attached {} played tracks to route {}", tracks.len(), route_id);
            }
        });
    }
}
