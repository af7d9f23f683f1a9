use std::fs::{self, File};
use std::path::Path;

use sbus_transport::{LogContext, Sender};

use crate::cmd::SendArgs;
use crate::exit::{io_error, sbus_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: SendArgs, log: LogContext) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    if !args.no_validate {
        ensure_json("--metadata", args.metadata.as_bytes())?;
        if !payload.is_empty() {
            ensure_json("payload", &payload)?;
        }
    }

    let files = open_files(&args.files)?;

    Sender::new(log)
        .send(&args.path, files.as_slice(), args.metadata.as_bytes(), &payload)
        .map_err(|err| sbus_error("send failed", err))?;

    tracing::info!(
        path = %args.path.display(),
        n_files = files.len(),
        bytes = payload.len(),
        "message sent"
    );
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(payload) = &args.payload {
        return Ok(payload.as_bytes().to_vec());
    }
    if let Some(path) = &args.payload_file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

fn ensure_json(what: &str, bytes: &[u8]) -> CliResult<()> {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|_| ())
        .map_err(|err| CliError::new(USAGE, format!("{what} is not valid JSON: {err}")))
}

fn open_files<P: AsRef<Path>>(paths: &[P]) -> CliResult<Vec<File>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))
        })
        .collect()
}
