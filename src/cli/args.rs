//! Command-line argument parsing for icn-watch.
//!
//! Flags override whatever [`GatewayConfig::from_env`] produced.

use std::time::Duration;
use thiserror::Error;

use crate::config::GatewayConfig;

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Watch the node (default)
    Watch(WatchOptions),
}

/// Overrides and switches for the watch command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchOptions {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub token: Option<String>,
    pub timeout_ms: Option<u64>,
    /// Force polling for every resource
    pub no_sse: bool,
    /// Resource keys to serve from the node's event stream
    pub push_keys: Vec<String>,
    /// Fetch every resource once, print and exit
    pub once: bool,
}

impl WatchOptions {
    /// Layer these options over `config`.
    pub fn apply(&self, mut config: GatewayConfig) -> GatewayConfig {
        if let Some(ref url) = self.url {
            config = config.with_base_url(url.clone());
        }
        if let Some(ref key) = self.api_key {
            config = config.with_api_key(key.clone());
        }
        if let Some(ref token) = self.token {
            config = config.with_bearer_token(token.clone());
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        if self.no_sse {
            config = config.with_enable_sse(false);
        }
        config
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ArgsError {
    #[error("{0} requires a value")]
    MissingValue(String),
    #[error("invalid value for {flag}: {value}")]
    InvalidValue { flag: String, value: String },
    #[error("unknown argument: {0}")]
    Unknown(String),
}

pub const USAGE: &str = "\
Usage: icn-watch [OPTIONS]

Options:
  --url <URL>          Node base URL (env ICN_API_URL)
  --api-key <KEY>      API key (env ICN_API_KEY)
  --token <TOKEN>      Bearer token (env ICN_BEARER_TOKEN)
  --timeout-ms <MS>    Per-request timeout (env ICN_API_TIMEOUT_MS)
  --no-sse             Poll every resource (env ICN_ENABLE_SSE=false)
  --push <KEYS>        Comma-separated keys to refresh from /events
  --once               Fetch once, print, exit
  -V, --version        Print version
  -h, --help           Print this help
";

/// Parse command-line arguments and return the appropriate command.
///
/// # Examples
///
/// ```
/// use icn_realtime::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["icn-watch".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), Ok(CliCommand::Version));
/// ```
pub fn parse_args<I>(args: I) -> Result<CliCommand, ArgsError>
where
    I: Iterator<Item = String>,
{
    let mut options = WatchOptions::default();
    // Skip the program name
    let mut args = args.skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(CliCommand::Version),
            "--help" | "-h" => return Ok(CliCommand::Help),
            "--url" => options.url = Some(value(&arg, args.next())?),
            "--api-key" => options.api_key = Some(value(&arg, args.next())?),
            "--token" => options.token = Some(value(&arg, args.next())?),
            "--timeout-ms" => {
                let raw = value(&arg, args.next())?;
                let ms = raw.parse::<u64>().map_err(|_| ArgsError::InvalidValue {
                    flag: arg.clone(),
                    value: raw.clone(),
                })?;
                options.timeout_ms = Some(ms);
            }
            "--push" => {
                let raw = value(&arg, args.next())?;
                options.push_keys = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "--no-sse" => options.no_sse = true,
            "--once" => options.once = true,
            _ => return Err(ArgsError::Unknown(arg)),
        }
    }
    Ok(CliCommand::Watch(options))
}

fn value(flag: &str, next: Option<String>) -> Result<String, ArgsError> {
    next.filter(|v| !v.starts_with("--"))
        .ok_or_else(|| ArgsError::MissingValue(flag.to_string()))
}
