//! The per-field read accumulator.
//!
//! A [`ReadState`] tracks one field of one frame: either the 4-byte header or
//! the payload it announced. It is never reused across a field boundary.
//! [`ReadState::advance`] consumes it and hands back either an updated
//! pending state or the completed field, and the caller installs a fresh
//! state for the next field.

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::codec::HEADER_SIZE;

/// Which part of a frame is being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Header,
    Payload,
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadMode::Header => f.write_str("header"),
            ReadMode::Payload => f.write_str("payload"),
        }
    }
}

/// In-progress read of a single field.
///
/// `buffered() + bytes_remaining()` always equals the field length the state
/// was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadState {
    mode: ReadMode,
    pending_chunks: Vec<Bytes>,
    bytes_remaining: usize,
}

/// Outcome of feeding bytes to a [`ReadState`].
#[derive(Debug, PartialEq, Eq)]
pub enum Advance {
    /// The cursor ran dry before the field completed.
    Pending(ReadState),
    /// The field is complete; the cursor points just past it.
    Complete { mode: ReadMode, field: Bytes },
}

impl ReadState {
    /// Fresh state expecting a frame header.
    pub fn header() -> Self {
        Self {
            mode: ReadMode::Header,
            pending_chunks: Vec::new(),
            bytes_remaining: HEADER_SIZE,
        }
    }

    /// Fresh state expecting a payload of `len` bytes.
    pub fn payload(len: usize) -> Self {
        Self {
            mode: ReadMode::Payload,
            pending_chunks: Vec::new(),
            bytes_remaining: len,
        }
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// Bytes still needed before the field completes.
    pub fn bytes_remaining(&self) -> usize {
        self.bytes_remaining
    }

    /// Bytes accumulated so far for this field.
    pub fn buffered(&self) -> usize {
        self.pending_chunks.iter().map(Bytes::len).sum()
    }

    /// Chunks accumulated so far, in arrival order.
    pub fn pending_chunks(&self) -> &[Bytes] {
        &self.pending_chunks
    }

    /// True when the field can complete without consuming more input.
    ///
    /// Only a zero-length payload is ever in this state.
    pub fn is_satisfied(&self) -> bool {
        self.bytes_remaining == 0
    }

    /// True when nothing of the next frame has been seen yet.
    pub fn is_idle(&self) -> bool {
        self.mode == ReadMode::Header && self.pending_chunks.is_empty()
    }

    /// Consume bytes from the front of `cursor`.
    ///
    /// If the cursor holds fewer bytes than the field still needs, all of it
    /// is taken and the updated state is returned as [`Advance::Pending`].
    /// Otherwise exactly `bytes_remaining` bytes are taken and joined with
    /// the pending chunks into the complete field.
    pub fn advance(mut self, cursor: &mut Bytes) -> Advance {
        if cursor.len() < self.bytes_remaining {
            let chunk = cursor.split_to(cursor.len());
            self.bytes_remaining -= chunk.len();
            if !chunk.is_empty() {
                self.pending_chunks.push(chunk);
            }
            return Advance::Pending(self);
        }

        let tail = cursor.split_to(self.bytes_remaining);
        let field = match self.pending_chunks.len() {
            0 => tail,
            _ => {
                let mut joined = BytesMut::with_capacity(self.buffered() + tail.len());
                for chunk in &self.pending_chunks {
                    joined.extend_from_slice(chunk);
                }
                joined.extend_from_slice(&tail);
                joined.freeze()
            }
        };

        Advance::Complete {
            mode: self.mode,
            field,
        }
    }
}

impl Default for ReadState {
    fn default() -> Self {
        Self::header()
    }
}
