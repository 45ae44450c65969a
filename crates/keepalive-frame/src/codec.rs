use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: a single 4-byte big-endian payload length.
pub const HEADER_SIZE: usize = 4;

/// Default size of each read from the underlying source: 8 KiB.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Encode a payload length as a frame header.
///
/// Fails if the length does not fit the 32-bit header.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_SIZE]> {
    let len = u32::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: u32::MAX as usize,
    })?;
    Ok(len.to_be_bytes())
}

/// Decode a frame header into the payload length it announces.
///
/// Every 32-bit value is a valid length.
pub fn decode_header(header: [u8; HEADER_SIZE]) -> usize {
    u32::from_be_bytes(header) as usize
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────┬─────────────────┐
/// │ Length (4B BE) │ Payload         │
/// │                │ (Length bytes)  │
/// └────────────────┴─────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header = encode_header(payload.len())?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&header);
    dst.put_slice(payload);
    Ok(())
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: unlimited.
    ///
    /// Without a limit a corrupt header simply makes the reader wait for
    /// bytes that never come. Set this when the peer is not trusted.
    pub max_payload_size: Option<usize>,
    /// Size of each read from the source. Default: 8 KiB.
    pub read_chunk_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: None,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl FrameConfig {
    /// Reject payloads larger than `max` bytes.
    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = Some(max);
        self
    }

    /// Fail with [`FrameError::PayloadTooLarge`] when `size` exceeds the limit.
    pub fn check_payload(&self, size: usize) -> Result<()> {
        match self.max_payload_size {
            Some(max) if size > max => Err(FrameError::PayloadTooLarge { size, max }),
            _ => Ok(()),
        }
    }
}

#[cfg(feature = "async")]
mod tokio_codec {
    use std::collections::VecDeque;

    use bytes::{BufMut, Bytes, BytesMut};
    use tokio_util::codec::{Decoder, Encoder};

    use super::{encode_header, FrameConfig, HEADER_SIZE};
    use crate::decoder::FrameDecoder;
    use crate::error::FrameError;

    /// `tokio_util` codec for keepalive frames.
    ///
    /// Decoding drains the whole read buffer into a [`FrameDecoder`] on every
    /// call, so completed frames are queued here rather than left in `src`.
    #[derive(Debug, Default)]
    pub struct KeepaliveCodec {
        decoder: FrameDecoder,
        ready: VecDeque<Bytes>,
        config: FrameConfig,
    }

    impl KeepaliveCodec {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_config(config: FrameConfig) -> Self {
            Self {
                decoder: FrameDecoder::with_max_payload(config.max_payload_size),
                ready: VecDeque::new(),
                config,
            }
        }
    }

    impl Decoder for KeepaliveCodec {
        type Item = Bytes;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
            if !src.is_empty() {
                let chunk = src.split().freeze();
                let ready = &mut self.ready;
                self.decoder.feed::<_, FrameError>(chunk, |frame| {
                    ready.push_back(frame);
                    Ok(())
                })?;
            }
            Ok(self.ready.pop_front())
        }

        fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
            if let Some(frame) = self.decode(src)? {
                return Ok(Some(frame));
            }
            self.decoder.finish()?;
            Ok(None)
        }
    }

    impl Encoder<Bytes> for KeepaliveCodec {
        type Error = FrameError;

        fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
            self.config.check_payload(payload.len())?;
            let header = encode_header(payload.len())?;
            dst.reserve(HEADER_SIZE + payload.len());
            dst.put_slice(&header);
            dst.put_slice(&payload);
            Ok(())
        }
    }
}

#[cfg(feature = "async")]
pub use tokio_codec::KeepaliveCodec;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_literal_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(&[0x41, 0x42, 0x43], &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x00, 0x00, 0x00, 0x03, 0x41, 0x42, 0x43]);
    }

    #[test]
    fn encode_empty_payload_is_bare_header() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0, 0, 0, 0]);
    }

    #[test]
    fn header_is_big_endian() {
        assert_eq!(encode_header(0x0102_0304).unwrap(), [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(decode_header([0x00, 0x00, 0x00, 0x05]), 5);
        assert_eq!(decode_header([0xFF, 0xFF, 0xFF, 0xFF]), u32::MAX as usize);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn header_rejects_lengths_over_u32() {
        let err = encode_header(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn config_payload_limit() {
        let unlimited = FrameConfig::default();
        assert!(unlimited.check_payload(usize::MAX).is_ok());

        let limited = FrameConfig::default().with_max_payload_size(4);
        assert!(limited.check_payload(4).is_ok());
        assert!(matches!(
            limited.check_payload(5),
            Err(FrameError::PayloadTooLarge { size: 5, max: 4 })
        ));
    }

    #[cfg(feature = "async")]
    mod async_codec {
        use bytes::Bytes;
        use futures_util::{SinkExt, StreamExt};
        use tokio_util::codec::{Decoder, FramedRead, FramedWrite};

        use super::super::*;
        use crate::state::ReadMode;

        #[test]
        fn decode_queues_multiple_frames_from_one_buffer() {
            let mut src = BytesMut::new();
            encode_frame(b"one", &mut src).unwrap();
            encode_frame(b"", &mut src).unwrap();
            encode_frame(b"three", &mut src).unwrap();

            let mut codec = KeepaliveCodec::new();
            assert_eq!(codec.decode(&mut src).unwrap().unwrap().as_ref(), b"one");
            assert!(src.is_empty());
            assert_eq!(codec.decode(&mut src).unwrap().unwrap().as_ref(), b"");
            assert_eq!(codec.decode(&mut src).unwrap().unwrap().as_ref(), b"three");
            assert!(codec.decode(&mut src).unwrap().is_none());
        }

        #[test]
        fn decode_eof_mid_frame_is_truncated() {
            let mut src = BytesMut::from(&[0x00, 0x00, 0x00, 0x09, b'x'][..]);
            let mut codec = KeepaliveCodec::new();
            assert!(codec.decode(&mut src).unwrap().is_none());

            let err = codec.decode_eof(&mut src).unwrap_err();
            assert!(matches!(
                err,
                FrameError::Truncated {
                    mode: ReadMode::Payload,
                    remaining: 8
                }
            ));
        }

        #[tokio::test]
        async fn framed_roundtrip_over_duplex() {
            let (client, server) = tokio::io::duplex(7);
            let mut sink = FramedWrite::new(client, KeepaliveCodec::new());
            let mut stream = FramedRead::new(server, KeepaliveCodec::new());

            let writer = tokio::spawn(async move {
                for payload in [&b"alpha"[..], &b""[..], &[0xAB; 300][..]] {
                    sink.send(Bytes::copy_from_slice(payload)).await.unwrap();
                }
            });

            assert_eq!(stream.next().await.unwrap().unwrap().as_ref(), b"alpha");
            assert_eq!(stream.next().await.unwrap().unwrap().as_ref(), b"");
            assert_eq!(stream.next().await.unwrap().unwrap().as_ref(), &[0xAB; 300][..]);

            writer.await.unwrap();
            assert!(stream.next().await.is_none());
        }

        #[tokio::test]
        async fn encoder_enforces_max_payload() {
            let (client, _server) = tokio::io::duplex(64);
            let mut sink = FramedWrite::new(
                client,
                KeepaliveCodec::with_config(FrameConfig::default().with_max_payload_size(2)),
            );
            let err = sink.send(Bytes::from_static(b"abc")).await.unwrap_err();
            assert!(matches!(err, FrameError::PayloadTooLarge { size: 3, max: 2 }));
        }
    }
}
