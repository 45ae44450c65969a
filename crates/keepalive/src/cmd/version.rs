use keepalive_frame::{DEFAULT_READ_CHUNK_SIZE, HEADER_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("keepalive {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: keepalive");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("KEEPALIVE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("wire: u32 big-endian length ({HEADER_SIZE} bytes) + payload");
    println!("read_chunk_size: {DEFAULT_READ_CHUNK_SIZE}");
    println!(
        "features: channel={}, async={}, cli=true",
        cfg!(feature = "channel"),
        cfg!(feature = "async")
    );

    Ok(SUCCESS)
}
