//! Command-line interface handling for the cadence frame loop.
//!
//! This module provides command-line argument parsing using the `clap` crate.
//! Every option overrides the matching setting from the configuration file.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the per-frame dispatch budget in milliseconds
    pub budget_ms: Option<u64>,
    /// Optional override for the number of frames to run
    pub frames: Option<u64>,
}

impl CliArgs {
    /// Builds the clap command describing every supported option.
    pub fn command() -> Command {
        Command::new("Cadence")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Frame loop driving a budgeted, prioritised event dispatcher")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("cadence.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("budget-ms")
                    .short('b')
                    .long("budget-ms")
                    .value_name("MILLIS")
                    .help("Dispatch budget per frame in milliseconds (0 = unbounded)")
                    .value_parser(value_parser!(u64)),
            )
            .arg(
                Arg::new("frames")
                    .short('f')
                    .long("frames")
                    .value_name("COUNT")
                    .help("Stop after this many frames (0 = run until interrupted)")
                    .value_parser(value_parser!(u64)),
            )
    }

    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&Self::command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("cadence.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            budget_ms: matches.get_one::<u64>("budget-ms").copied(),
            frames: matches.get_one::<u64>("frames").copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["cadence"]).unwrap();

        assert_eq!(args.config_path, PathBuf::from("cadence.toml"));
        assert_eq!(args.log_level, None);
        assert!(!args.json_logs);
        assert_eq!(args.budget_ms, None);
        assert_eq!(args.frames, None);
    }

    #[test]
    fn test_all_overrides() {
        let args = CliArgs::try_parse_from([
            "cadence",
            "-c",
            "bench.toml",
            "--log-level",
            "debug",
            "--json-logs",
            "-b",
            "2",
            "--frames",
            "600",
        ])
        .unwrap();

        assert_eq!(args.config_path, PathBuf::from("bench.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.budget_ms, Some(2));
        assert_eq!(args.frames, Some(600));
    }

    #[test]
    fn test_rejects_non_numeric_budget() {
        assert!(CliArgs::try_parse_from(["cadence", "--budget-ms", "soon"]).is_err());
    }
}
