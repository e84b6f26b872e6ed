//! Command-line interface handling for the trail tracker.
//!
//! Arguments are parsed with `clap`; any option given here overrides the
//! matching value from the configuration file.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// What the binary should do once configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run the tracker until a shutdown signal arrives
    Serve,
    /// Print a summary of every stored path
    List,
    /// Print the details of one stored path
    Info(String),
}

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the path storage directory
    pub paths_dir: Option<PathBuf>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Whether `serve` stops once the event feed reaches end of input
    pub exit_on_eof: bool,
    pub mode: Mode,
}

impl CliArgs {
    fn command() -> Command {
        Command::new("TrailTracker")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Records, shows and announces paths walked by agents in a live world")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("trailtracker.toml")
                    .global(true),
            )
            .arg(
                Arg::new("paths")
                    .short('p')
                    .long("paths")
                    .value_name("DIR")
                    .help("Path storage directory")
                    .global(true),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)")
                    .global(true),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue)
                    .global(true),
            )
            .arg(
                Arg::new("exit-on-eof")
                    .long("exit-on-eof")
                    .help("Shut down when the event feed on stdin closes")
                    .action(clap::ArgAction::SetTrue)
                    .global(true),
            )
            .subcommand(Command::new("serve").about("Run the tracker (default)"))
            .subcommand(Command::new("list").about("List stored paths"))
            .subcommand(
                Command::new("info")
                    .about("Show details of a stored path")
                    .arg(Arg::new("name").value_name("NAME").required(true)),
            )
    }

    /// Parses the process arguments.
    ///
    /// Exits with a usage message when they are invalid.
    pub fn parse() -> Self {
        Self::try_parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
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
        let mode = match matches.subcommand() {
            Some(("list", _)) => Mode::List,
            Some(("info", sub)) => {
                Mode::Info(sub.get_one::<String>("name").cloned().unwrap_or_default())
            }
            _ => Mode::Serve,
        };

        // Global options are visible in the subcommand's matches, whichever
        // side of the subcommand they were given on.
        let scope = matches.subcommand().map(|(_, sub)| sub).unwrap_or(matches);

        Self {
            config_path: scope
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("trailtracker.toml")),
            paths_dir: scope.get_one::<String>("paths").map(PathBuf::from),
            log_level: scope.get_one::<String>("log-level").cloned(),
            json_logs: scope.get_flag("json-logs"),
            exit_on_eof: scope.get_flag("exit-on-eof"),
            mode,
        }
    }
}
