//! Length-prefixed message framing over persistent byte streams.
//!
//! Every message on the wire is:
//! - A 4-byte big-endian payload length
//! - Exactly that many payload bytes
//!
//! There is no magic number, version byte or checksum; streams must start on
//! a header boundary. Incoming bytes may be chunked arbitrarily. The
//! [`FrameDecoder`] reassembles them one chunk at a time through an explicit
//! [`ReadState`] machine, so callers never deal with partial reads.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod state;
pub mod writer;

#[cfg(feature = "async")]
pub use codec::KeepaliveCodec;
pub use codec::{
    decode_header, encode_frame, encode_header, FrameConfig, DEFAULT_READ_CHUNK_SIZE, HEADER_SIZE,
};
pub use decoder::FrameDecoder;
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use state::{Advance, ReadMode, ReadState};
pub use writer::FrameWriter;
