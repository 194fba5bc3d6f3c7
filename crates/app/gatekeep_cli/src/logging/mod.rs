pub mod formats;

use flexi_logger::{Logger, LoggerHandle};

use crate::Error;

/// Log to stderr so stdout stays clean for command output. `RUST_LOG`
/// wins over `level`.
pub fn init(level: &str) -> Result<LoggerHandle, Error> {
    let handle = Logger::try_with_env_or_str(level)?
        .format(formats::cli_format)
        .log_to_stderr()
        .start()?;

    Ok(handle)
}
