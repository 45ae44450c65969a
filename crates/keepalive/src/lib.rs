//! Length-prefixed message channels over the stdio of long-lived processes.
//!
//! A parent spawns a helper once and keeps talking to it: every message on
//! the wire is a 4-byte big-endian length followed by that many payload
//! bytes. The helper side reads chunks from stdin, reassembles complete
//! messages regardless of how the bytes were split, and answers on stdout.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-stream sources and sinks (stdio, child pipes)
//! - [`frame`]: read state machine, decoder, blocking reader/writer and tokio codec
//! - [`channel`]: framed stdio channel, responder and keepalive client (behind `channel` feature)

/// Re-export transport types.
pub mod transport {
    pub use keepalive_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use keepalive_frame::*;
}

/// Re-export channel types (requires `channel` feature).
#[cfg(feature = "channel")]
pub mod channel {
    pub use keepalive_channel::*;
}
