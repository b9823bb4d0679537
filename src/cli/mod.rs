//! CLI module for icn-watch.
//!
//! - Argument parsing
//! - Version display
//! - The watch loop
//!
//! ```ignore
//! use icn_realtime::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args())?;
//! if let Some(result) = run_cli_command(&command) {
//!     return result;
//! }
//! ```

pub mod args;
pub mod version;
pub mod watch;

pub use args::{parse_args, ArgsError, CliCommand, WatchOptions, USAGE};
pub use version::{version_line, VERSION};
pub use watch::run_watch;

use color_eyre::Result;

/// Handle the commands that finish without touching the network.
///
/// Returns `None` for [`CliCommand::Watch`], which needs the async runtime.
pub fn run_cli_command(command: &CliCommand) -> Option<Result<()>> {
    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            Some(Ok(()))
        }
        CliCommand::Help => {
            print!("{}", USAGE);
            Some(Ok(()))
        }
        CliCommand::Watch(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_returns_none() {
        let result = run_cli_command(&CliCommand::Watch(WatchOptions::default()));
        assert!(result.is_none());
    }

    #[test]
    fn test_version_returns_ok() {
        assert!(matches!(run_cli_command(&CliCommand::Version), Some(Ok(()))));
    }
}
