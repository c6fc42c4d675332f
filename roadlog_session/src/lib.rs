use std::fmt;

pub mod config;
pub mod sample_gate;
pub mod stop_detector;
pub mod stores;
mod trip_session;

pub use config::SessionConfig;
pub use trip_session::*;

/// Errors surfaced by trip session operations.
#[derive(Debug)]
pub enum SessionError {
    /// Operation invoked in a lifecycle state that forbids it.
    InvalidState(String),
    /// A route store call failed. The in-memory lifecycle state is not
    /// rolled back; the caller decides whether to retry.
    Persistence(String),
    /// Image upload failed after exhausting its retries.
    Upload(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidState(msg) => write!(f, "invalid session state: {msg}"),
            SessionError::Persistence(msg) => write!(f, "persistence failure: {msg}"),
            SessionError::Upload(msg) => write!(f, "upload failure: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}
