use std::time::Duration;

/// Error type message handlers may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in channel and client operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] keepalive_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] keepalive_frame::FrameError),

    /// The message handler returned an error.
    #[error("message handler failed: {0}")]
    Handler(#[source] BoxError),

    /// The other side of the channel is gone.
    #[error("channel closed: {0}")]
    Closed(String),

    /// Request timed out.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A thread panicked while holding the output stream.
    #[error("output stream lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, ChannelError>;
