use clap::{Args, Subcommand};
use sbus_transport::LogContext;
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single message.
    Send(SendArgs),
    /// Bind a channel and print received messages.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, log: LogContext) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, log),
        Command::Listen(args) => listen::run(args, format, log),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Channel socket path to send to.
    pub path: PathBuf,
    /// Metadata string (JSON unless --no-validate).
    #[arg(long, default_value = "{}")]
    pub metadata: String,
    /// Payload string (JSON unless --no-validate).
    #[arg(long, conflicts_with = "payload_file")]
    pub payload: Option<String>,
    /// Read the payload from a file.
    #[arg(long, value_name = "FILE", conflicts_with = "payload")]
    pub payload_file: Option<PathBuf>,
    /// Open FILE read-only and pass its descriptor. Repeat to pass several, in order.
    #[arg(long = "fd", value_name = "FILE")]
    pub files: Vec<PathBuf>,
    /// Send metadata and payload as-is without checking they parse as JSON.
    #[arg(long)]
    pub no_validate: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Channel socket path to bind.
    pub path: PathBuf,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Leave the socket file in place on exit.
    #[arg(long)]
    pub keep_socket: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
