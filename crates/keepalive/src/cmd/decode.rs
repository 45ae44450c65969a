use std::fs::File;
use std::io::Read;

use keepalive_frame::{FrameConfig, FrameError, FrameReader};
use keepalive_transport::ByteSource;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_frame, Direction, FrameReport, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat, config: FrameConfig) -> CliResult<i32> {
    let input: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(ByteSource::stdin()),
    };

    let mut reader = FrameReader::with_config(input, config);
    let decoded = decode_frames(&mut reader, args.count, |index, payload| {
        print_frame(
            &FrameReport {
                direction: Direction::Decoded,
                index,
                payload,
                elapsed_ms: None,
            },
            format,
        );
    })
    .map_err(|err| frame_error("decode failed", err))?;

    tracing::debug!(frames = decoded, "input exhausted");
    Ok(SUCCESS)
}

/// Read frames until a clean close or `limit`, returning how many were seen.
fn decode_frames<R, F>(
    reader: &mut FrameReader<R>,
    limit: Option<u64>,
    mut on_frame: F,
) -> Result<u64, FrameError>
where
    R: Read,
    F: FnMut(u64, &[u8]),
{
    let mut index = 0u64;
    while limit.is_none_or(|max| index < max) {
        match reader.read_frame() {
            Ok(payload) => {
                on_frame(index, &payload);
                index += 1;
            }
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(index)
}
