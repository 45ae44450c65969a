use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::FrameConfig;
use crate::decoder::FrameDecoder;
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally, so callers always get complete payloads.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    ready: VecDeque<Bytes>,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::with_max_payload(config.max_payload_size),
            ready: VecDeque::new(),
            buf: BytesMut::new(),
            config,
        }
    }

    /// Read the next complete frame payload (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached on a
    /// frame boundary and `Err(FrameError::Truncated { .. })` when it is
    /// reached part-way through a frame.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(frame);
            }

            self.buf.resize(self.config.read_chunk_size.max(1), 0);
            let read = match self.inner.read(&mut self.buf) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };
            self.buf.truncate(read);

            if read == 0 {
                return match self.decoder.finish() {
                    Ok(()) => {
                        debug!("frame stream closed");
                        Err(FrameError::ConnectionClosed)
                    }
                    Err(err) => {
                        warn!(error = %err, "frame stream closed mid-frame");
                        Err(err)
                    }
                };
            }

            let ready = &mut self.ready;
            self.decoder
                .feed::<_, FrameError>(self.buf.split().freeze(), |frame| {
                    ready.push_back(frame);
                    Ok(())
                })?;
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Frames already decoded but not yet returned are lost.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Bytes>;

    /// Yields payloads until the stream closes on a frame boundary.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::ConnectionClosed) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;
    use crate::state::ReadMode;

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"hello"])));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"one", b"two", b"three"])));

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"three");
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn read_frame_with_large_payload() {
        let payload = vec![0xAB; 64 * 1024];
        let mut reader = FrameReader::new(Cursor::new(wire(&[payload.as_slice()])));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_ref(), payload.as_slice());
    }

    #[test]
    fn small_read_chunks() {
        let config = FrameConfig {
            read_chunk_size: 3,
            ..FrameConfig::default()
        };
        let mut reader =
            FrameReader::with_config(Cursor::new(wire(&[b"chunked", b"", b"x"])), config);

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"chunked");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"x");
        assert_eq!(reader.config().read_chunk_size, 3);
    }

    #[test]
    fn byte_at_a_time_source() {
        let bytes = wire(&[b"slow", b"", b"done"]);
        let steps = bytes.iter().map(|b| Step::Data(vec![*b])).collect();
        let mut reader = FrameReader::new(Scripted::new(steps));

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"slow");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"done");
    }

    #[test]
    fn one_read_completing_several_frames_queues_them() {
        let mut reader = FrameReader::new(Scripted::new(vec![Step::Data(wire(&[b"a", b"bb"]))]));

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"a");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"bb");
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn earlier_frames_survive_buffer_reuse() {
        let config = FrameConfig {
            read_chunk_size: 6,
            ..FrameConfig::default()
        };
        let mut reader =
            FrameReader::with_config(Cursor::new(wire(&[b"ab", b"cdef", b"gh"])), config);

        let first = reader.read_frame().unwrap();
        let second = reader.read_frame().unwrap();
        let third = reader.read_frame().unwrap();
        assert_eq!(first.as_ref(), b"ab");
        assert_eq!(second.as_ref(), b"cdef");
        assert_eq!(third.as_ref(), b"gh");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_payload() {
        let mut partial = vec![0, 0, 0, 16];
        partial.extend_from_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                mode: ReadMode::Payload,
                remaining: 7
            }
        ));
    }

    #[test]
    fn connection_closed_mid_header() {
        let mut reader = FrameReader::new(Cursor::new(vec![0, 0, 1]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                mode: ReadMode::Header,
                remaining: 1
            }
        ));
    }

    #[test]
    fn oversized_frame_in_stream() {
        let cfg = FrameConfig::default().with_max_payload_size(16);
        let mut reader = FrameReader::with_config(Cursor::new(vec![0, 0, 4, 0]), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn iterator_stops_on_clean_close() {
        let reader = FrameReader::new(Cursor::new(wire(&[b"a", b"b"])));
        let frames: Vec<Bytes> = reader.map(|frame| frame.unwrap()).collect();
        assert_eq!(frames, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
    }

    #[test]
    fn iterator_surfaces_truncation() {
        let mut bytes = wire(&[b"whole"]);
        bytes.extend_from_slice(&[0, 0, 0, 3, b'x']);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        assert_eq!(reader.next().unwrap().unwrap().as_ref(), b"whole");
        assert!(matches!(
            reader.next(),
            Some(Err(FrameError::Truncated { .. }))
        ));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(b"ping").unwrap();
        writer.send(b"").unwrap();
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"ping");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"");

        drop(writer);
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let mut reader = FrameReader::new(Scripted::new(vec![
            Step::Fail(ErrorKind::Interrupted),
            Step::Data(wire(&[b"ok"])),
        ]));
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"ok");
    }

    #[test]
    fn other_read_errors_propagate() {
        let mut reader = FrameReader::new(Scripted::new(vec![
            Step::Data(vec![0, 0]),
            Step::Fail(ErrorKind::WouldBlock),
            Step::Data(vec![0, 1, b'z']),
        ]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));

        // The partial header survives the error.
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"z");
    }

    enum Step {
        Data(Vec<u8>),
        Fail(ErrorKind),
    }

    /// Source that replays a fixed script of reads, then reports EOF.
    struct Scripted {
        steps: std::collections::VecDeque<Step>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Step::Fail(kind)) => Err(std::io::Error::from(kind)),
                Some(Step::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.push_front(Step::Data(data.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }
}
