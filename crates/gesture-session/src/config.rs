//! Session sizing

use crate::error::SessionError;
use serde::{Deserialize, Serialize};

/// Ring-buffer capacities and reporting cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Gesture history entries kept per session
    pub history_capacity: usize,
    /// Entries kept in each performance buffer
    pub sample_capacity: usize,
    /// History entries used for the rolling FPS
    pub fps_window: usize,
    /// Gestures between performance log lines
    pub perf_log_interval: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            sample_capacity: 100,
            fps_window: 30,
            perf_log_interval: 100,
        }
    }
}

impl SessionConfig {
    /// Check every size is non-zero
    ///
    /// # Errors
    /// Returns `SessionError::ZeroCapacity` naming the first zero field.
    pub fn validate(&self) -> Result<(), SessionError> {
        let fields = [
            ("history_capacity", self.history_capacity as u64),
            ("sample_capacity", self.sample_capacity as u64),
            ("fps_window", self.fps_window as u64),
            ("perf_log_interval", self.perf_log_interval),
        ];
        match fields.into_iter().find(|(_, v)| *v == 0) {
            Some((field, _)) => Err(SessionError::ZeroCapacity { field }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = SessionConfig {
            fps_window: 0,
            ..SessionConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SessionError::ZeroCapacity { field: "fps_window" })
        );
    }
}
