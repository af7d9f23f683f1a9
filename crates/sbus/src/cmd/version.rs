use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sbus {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: sbus");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SBUS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("max_fds: {}", sbus_frame::MAX_FDS);
    println!("max_msg_length: {}", sbus_frame::MAX_MSG_LENGTH);
    println!("header_size: {}", sbus_frame::HEADER_SIZE);

    Ok(SUCCESS)
}
