//! Parent side: spawn one child and reuse it for several requests.
//!
//! `cat` copies its input verbatim, which makes it a valid framed echo peer.
//!
//! Run with:
//!   cargo run --example parent-call

use std::time::Duration;

use keepalive::channel::KeepaliveClient;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = KeepaliveClient::spawn("cat", std::iter::empty::<&str>())?;
    eprintln!("child pid: {:?}", client.child_id());

    for word in ["alpha", "beta", "gamma"] {
        let reply = client.request_timeout(word.as_bytes(), Duration::from_secs(2))?;
        println!("{word} -> {}", String::from_utf8_lossy(&reply));
    }

    let status = client.shutdown()?;
    eprintln!("child exited: {status:?}");
    Ok(())
}
