use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sbus_transport::{Channel, ErrorKind, LogContext};

use crate::cmd::ListenArgs;
use crate::exit::{sbus_error, CliError, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat, log: LogContext) -> CliResult<i32> {
    // Installed before the socket exists so an early Ctrl-C still exits cleanly.
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone(), args.path.clone())?;

    let mut channel =
        Channel::create(&args.path, log).map_err(|err| sbus_error("create failed", err))?;

    tracing::info!(path = %channel.path().display(), "listening");
    let result = receive_loop(&mut channel, &args, format, &running);

    if args.keep_socket {
        drop(channel);
    } else if let Err(err) = channel.remove() {
        tracing::warn!(error = %err, "failed to remove socket file");
    }

    result
}

fn receive_loop(
    channel: &mut Channel,
    args: &ListenArgs,
    format: OutputFormat,
    running: &AtomicBool,
) -> CliResult<i32> {
    let label = channel.path().display().to_string();
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        channel
            .wait_readable()
            .map_err(|err| sbus_error("wait failed", err))?;
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let message = match channel.recv() {
            Ok(message) => message,
            // A bad datagram from one sender must not stop the listener.
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Truncation | ErrorKind::ProtocolViolation
                ) =>
            {
                tracing::warn!(kind = %err.kind(), error = %err, "dropped malformed message");
                continue;
            }
            Err(err) => return Err(sbus_error("receive failed", err)),
        };

        print_message(&message, &label, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

/// On Ctrl-C, clear `running` and poke the channel so a blocked wait returns.
fn install_ctrlc_handler(running: Arc<AtomicBool>, path: PathBuf) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        if let Ok(socket) = UnixDatagram::unbound() {
            let _ = socket.send_to(&[], &path);
        }
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
