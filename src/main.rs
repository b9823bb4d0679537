use color_eyre::Result;
use icn_realtime::cli::{parse_args, run_cli_command, run_watch, CliCommand, USAGE};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    color_eyre::install()?;

    let command = match parse_args(std::env::args()) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if let Some(result) = run_cli_command(&command) {
        return result;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("icn_realtime=info")),
        )
        .init();

    let CliCommand::Watch(options) = command else {
        return Ok(());
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_watch(&options))
}
