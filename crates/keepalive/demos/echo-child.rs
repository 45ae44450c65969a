//! Long-lived helper that upper-cases every framed message it receives.
//!
//! Run with:
//!   cargo run --example echo-child
//!
//! and drive it from another process, e.g.:
//!   cargo run --features cli -- call --data hello --repeat 3 -- \
//!     cargo run -q --example echo-child

use keepalive::channel::{FramedChannel, HandlerResult, Responder};

fn shout(message: bytes::Bytes, respond: &Responder) -> HandlerResult {
    let text = std::str::from_utf8(&message)?;
    respond.respond(text.to_uppercase())?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut channel = FramedChannel::stdio(shout);
    channel.run()?;
    eprintln!("input closed after {} messages", channel.messages_handled());
    Ok(())
}
