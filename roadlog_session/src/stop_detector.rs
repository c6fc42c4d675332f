use roadlog_lib::geo_sample::GeoSample;
use serde::{Deserialize, Serialize};

/// Binary movement classification gating camera availability in the
/// presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementState {
    Moving,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Slow,
    NotSlow,
    /// Accuracy bound failed; the fix never drives a transition by itself.
    Unknown,
}

/// What the session should do after an evaluation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignore,
    /// A stop candidate began. The caller schedules the confirmation timer,
    /// carrying the returned generation token.
    BeginStopCandidate(u64),
    /// A transition committed on this tick.
    Transition(MovementState),
}

/// Debounced stop/move state machine.
///
/// Starts Stopped: until the first classification completes the camera stays
/// disabled. Stopping is debounced through a confirmation window so momentary
/// braking never enables the camera mid-drive; resuming motion commits on the
/// very next tick.
#[derive(Debug)]
pub struct StopDetector {
    movement: MovementState,
    candidate_pending: bool,
    generation: u64,
    slow_speed_mps: f64,
    accuracy_bound_m: f64,
}

impl StopDetector {
    pub fn new(slow_speed_mps: f64, accuracy_bound_m: f64) -> Self {
        Self {
            movement: MovementState::Stopped,
            candidate_pending: false,
            generation: 0,
            slow_speed_mps,
            accuracy_bound_m,
        }
    }

    pub fn movement(&self) -> MovementState {
        self.movement
    }

    fn classify(&self, sample: &GeoSample) -> Classification {
        if sample.horizontal_accuracy_m >= self.accuracy_bound_m {
            return Classification::Unknown;
        }
        if sample.speed_mps < self.slow_speed_mps {
            Classification::Slow
        } else {
            Classification::NotSlow
        }
    }

    /// Evaluate the latest accepted sample on the fixed tick.
    pub fn on_tick(&mut self, sample: &GeoSample) -> TickOutcome {
        match self.classify(sample) {
            Classification::Unknown => TickOutcome::Ignore,
            Classification::NotSlow => {
                if self.candidate_pending {
                    // The vehicle moved before the window elapsed; any
                    // in-flight confirmation becomes stale.
                    self.candidate_pending = false;
                    self.generation += 1;
                }
                if self.movement == MovementState::Stopped {
                    self.movement = MovementState::Moving;
                    TickOutcome::Transition(MovementState::Moving)
                } else {
                    TickOutcome::Ignore
                }
            }
            Classification::Slow => {
                if self.movement == MovementState::Moving && !self.candidate_pending {
                    self.candidate_pending = true;
                    TickOutcome::BeginStopCandidate(self.generation)
                } else {
                    TickOutcome::Ignore
                }
            }
        }
    }

    /// Commit a pending stop once its confirmation window has elapsed.
    ///
    /// A no-op when the generation token is stale, the candidate was aborted,
    /// or the latest sample no longer classifies as slow. Returns whether the
    /// transition committed.
    pub fn confirm_stop(&mut self, generation: u64, latest: Option<&GeoSample>) -> bool {
        if generation != self.generation || !self.candidate_pending {
            return false;
        }
        self.candidate_pending = false;

        match latest {
            Some(sample) if self.classify(sample) == Classification::Slow => {
                self.movement = MovementState::Stopped;
                true
            }
            _ => false,
        }
    }

    /// Back to the default Stopped state. Bumps the generation so any
    /// scheduled confirmation from the previous trip is invalidated.
    pub fn reset(&mut self) {
        self.movement = MovementState::Stopped;
        self.candidate_pending = false;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn detector() -> StopDetector {
        StopDetector::new(1.34, 20.0)
    }

    fn fix(speed_mps: f64, accuracy_m: f64) -> GeoSample {
        GeoSample::new(56.0, 9.9, speed_mps, accuracy_m, Utc::now())
    }

    #[test]
    fn starts_stopped_and_moves_on_first_fast_tick() {
        let mut det = detector();
        assert_eq!(det.movement(), MovementState::Stopped);

        let outcome = det.on_tick(&fix(5.0, 5.0));
        assert_eq!(outcome, TickOutcome::Transition(MovementState::Moving));
        assert_eq!(det.movement(), MovementState::Moving);

        // Staying fast produces no further transitions.
        assert_eq!(det.on_tick(&fix(6.0, 5.0)), TickOutcome::Ignore);
    }

    #[test]
    fn slow_ticks_commit_stopped_only_through_confirmation() {
        let mut det = detector();
        det.on_tick(&fix(5.0, 5.0));

        let TickOutcome::BeginStopCandidate(generation) = det.on_tick(&fix(0.5, 5.0)) else {
            panic!("expected a stop candidate");
        };
        // Still moving until the window elapses.
        assert_eq!(det.movement(), MovementState::Moving);
        // Further slow ticks do not restart the candidate.
        assert_eq!(det.on_tick(&fix(0.4, 5.0)), TickOutcome::Ignore);

        assert!(det.confirm_stop(generation, Some(&fix(0.3, 5.0))));
        assert_eq!(det.movement(), MovementState::Stopped);
    }

    #[test]
    fn fast_tick_inside_the_window_aborts_the_candidate() {
        let mut det = detector();
        det.on_tick(&fix(5.0, 5.0));

        let TickOutcome::BeginStopCandidate(generation) = det.on_tick(&fix(0.5, 5.0)) else {
            panic!("expected a stop candidate");
        };
        assert_eq!(det.on_tick(&fix(5.0, 5.0)), TickOutcome::Ignore);

        // The stale confirmation fires later and must not commit.
        assert!(!det.confirm_stop(generation, Some(&fix(0.5, 5.0))));
        assert_eq!(det.movement(), MovementState::Moving);
    }

    #[test]
    fn confirmation_rechecks_the_latest_sample() {
        let mut det = detector();
        det.on_tick(&fix(5.0, 5.0));

        let TickOutcome::BeginStopCandidate(generation) = det.on_tick(&fix(0.5, 5.0)) else {
            panic!("expected a stop candidate");
        };
        // Latest sample sped up again without a tick in between.
        assert!(!det.confirm_stop(generation, Some(&fix(3.0, 5.0))));
        assert_eq!(det.movement(), MovementState::Moving);
    }

    #[test]
    fn moving_commits_immediately_from_stopped() {
        let mut det = detector();
        det.on_tick(&fix(5.0, 5.0));
        let TickOutcome::BeginStopCandidate(generation) = det.on_tick(&fix(0.5, 5.0)) else {
            panic!("expected a stop candidate");
        };
        assert!(det.confirm_stop(generation, Some(&fix(0.5, 5.0))));

        assert_eq!(
            det.on_tick(&fix(2.0, 5.0)),
            TickOutcome::Transition(MovementState::Moving)
        );
    }

    #[test]
    fn inaccurate_fixes_never_drive_transitions() {
        let mut det = detector();
        // Fast but inaccurate: stays Stopped.
        assert_eq!(det.on_tick(&fix(10.0, 50.0)), TickOutcome::Ignore);
        assert_eq!(det.movement(), MovementState::Stopped);

        det.on_tick(&fix(5.0, 5.0));
        // Slow but inaccurate: no candidate while Moving.
        assert_eq!(det.on_tick(&fix(0.5, 25.0)), TickOutcome::Ignore);
        assert_eq!(det.movement(), MovementState::Moving);
    }

    #[test]
    fn reset_invalidates_scheduled_confirmations() {
        let mut det = detector();
        det.on_tick(&fix(5.0, 5.0));
        let TickOutcome::BeginStopCandidate(generation) = det.on_tick(&fix(0.5, 5.0)) else {
            panic!("expected a stop candidate");
        };

        det.reset();
        assert!(!det.confirm_stop(generation, Some(&fix(0.5, 5.0))));
        assert_eq!(det.movement(), MovementState::Stopped);
    }
}
