//! Framed stdio channel for long-lived helper processes.
//!
//! Two sides of the same bridge live here:
//! - [`FramedChannel`] runs inside the long-lived child. It reads framed
//!   requests from an input stream (stdin by default), hands each payload to
//!   a message handler and lets the handler answer through a [`Responder`].
//! - [`KeepaliveClient`] runs in the parent. It spawns the child once and
//!   exchanges framed requests and responses with it for as long as it lives.

#[cfg(feature = "async")]
pub mod async_channel;
pub mod channel;
pub mod client;
pub mod error;
pub mod responder;

#[cfg(feature = "async")]
pub use async_channel::AsyncFramedChannel;
pub use channel::{FramedChannel, HandlerResult};
pub use client::KeepaliveClient;
pub use error::{BoxError, ChannelError, Result};
pub use responder::Responder;
