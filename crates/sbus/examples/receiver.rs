//! Minimal receiver: binds a channel and prints every message until one says stop.
//!
//! Run with:
//!   cargo run --example receiver
//!
//! In another terminal:
//!   cargo run --features cli -- send /tmp/sbus-receiver-<pid>/rx.sbus \
//!     --metadata '{"a":1}' --payload '{"cmd":"stop"}' --fd /etc/hostname

use std::fs;
use std::io::Read;

use sbus::transport::{Channel, LogContext, LogLevel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("sbus-receiver-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("rx.sbus");

    let log = LogContext::start(LogLevel::Info, "example");
    let mut channel = Channel::create(&sock_path, log.clone())?;
    eprintln!("Listening on {}", sock_path.display());

    loop {
        channel.wait_readable()?;
        let message = match channel.recv() {
            Ok(message) => message,
            Err(e) => {
                eprintln!("Dropped message: {e}");
                continue;
            }
        };

        eprintln!(
            "Received {} descriptors, metadata {:?}, payload {:?}",
            message.n_files(),
            String::from_utf8_lossy(&message.metadata),
            String::from_utf8_lossy(&message.payload)
        );

        let stop = message.payload.as_ref() == br#"{"cmd":"stop"}"#;
        for fd in message.descriptors {
            let mut head = Vec::new();
            fs::File::from(fd).take(64).read_to_end(&mut head)?;
            eprintln!("  first bytes: {:?}", String::from_utf8_lossy(&head));
        }
        if stop {
            break;
        }
    }

    channel.remove()?;
    log.stop();
    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
