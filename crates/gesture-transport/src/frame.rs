//! Backend-neutral WebSocket frames

/// Close status codes used by the gateway
pub struct CloseCode;

impl CloseCode {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const INTERNAL_ERROR: u16 = 1011;
}

/// One frame as seen by the connection driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<(u16, String)>),
}

impl WireFrame {
    /// Close frame with a status code and reason
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        Self::Close(Some((code, reason.into())))
    }

    /// Payload size counted against the backpressure threshold
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) | Self::Ping(b) | Self::Pong(b) => b.len(),
            Self::Close(frame) => frame.as_ref().map_or(0, |(_, reason)| 2 + reason.len()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    #[must_use]
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }
}
