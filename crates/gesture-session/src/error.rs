//! Error types for session configuration

/// Session configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A buffer or window size was zero
    #[error("{field} must be at least 1")]
    ZeroCapacity { field: &'static str },
}
