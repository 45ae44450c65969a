//! Byte-stream transport for keepalive channels.
//!
//! A keepalive channel only ever sees two capabilities: a [`ByteSource`] it
//! reads chunks from and a [`ByteSink`] it writes frames to. This crate
//! provides both over:
//! - the current process's standard input/output
//! - the piped stdin/stdout of a spawned [`ChildProcess`]
//!
//! This is the lowest layer of keepalive. Nothing in here knows about frames.

pub mod child;
pub mod error;
pub mod stream;

pub use child::ChildProcess;
pub use error::{Result, TransportError};
pub use stream::{stdio, ByteSink, ByteSource};

#[cfg(feature = "async")]
pub use stream::async_stdio;
