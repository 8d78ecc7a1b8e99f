use std::io::Write;

use anyhow::Error;

use clap::{ArgAction, Parser, Subcommand};

mod diversity;
use diversity::Diversity;

mod overlap;
use overlap::Overlap;

mod samples;

const NAME: &str = env!("CARGO_BIN_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Diversity and overlap statistics for immune repertoires.
#[derive(Debug, Parser)]
#[command(name = NAME, version = VERSION, about, long_about = None, subcommand_required = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Disable all log output.
    ///
    /// Per-item failures are then only reflected in the final error and exit status.
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Increase log output.
    ///
    /// Repeat to log progress (-v), details (-vv), or everything (-vvv). Without it, only
    /// warnings and errors are logged.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Dump parsed arguments to stderr.
    #[arg(long, hide = true, global = true)]
    debug: bool,
}

impl Cli {
    pub fn run(self) -> Result<(), Error> {
        if self.debug {
            eprintln!("{self:#?}");
        }

        let level = if self.quiet {
            log::LevelFilter::Off
        } else {
            match self.verbose {
                0 => log::LevelFilter::Warn,
                1 => log::LevelFilter::Info,
                2 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            }
        };

        match env_logger::Builder::new()
            .filter_level(level)
            .target(env_logger::Target::Stderr)
            .format(|buf, record| {
                let level = record.level().as_str().to_lowercase();
                let args = record.args();
                writeln!(buf, "[clonal {level:>5}] {args}")
            })
            .try_init()
        {
            Ok(()) => (),
            Err(e) => eprintln!("failed to setup logger: {e}"),
        }

        self.command.run()
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Diversity(Diversity),
    Overlap(Overlap),
}

impl Command {
    fn run(self) -> Result<(), Error> {
        match self {
            Command::Diversity(diversity) => diversity.run(),
            Command::Overlap(overlap) => overlap.run(),
        }
    }
}

impl TryFrom<Command> for Diversity {
    type Error = Command;

    fn try_from(command: Command) -> Result<Self, Self::Error> {
        match command {
            Command::Diversity(diversity) => Ok(diversity),
            command => Err(command),
        }
    }
}

impl TryFrom<Command> for Overlap {
    type Error = Command;

    fn try_from(command: Command) -> Result<Self, Self::Error> {
        match command {
            Command::Overlap(overlap) => Ok(overlap),
            command => Err(command),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.run() {
        Ok(()) => (),
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::error::ErrorKind as ClapErrorKind;

    fn try_parse_args(cmd: &str) -> Result<Cli, clap::Error> {
        Parser::try_parse_from(cmd.split_whitespace())
    }

    pub fn try_parse_subcmd<T>(cmd: &str) -> Result<T, clap::Error>
    where
        T: TryFrom<Command>,
        T::Error: std::fmt::Debug,
    {
        try_parse_args(cmd).map(|cli| T::try_from(cli.command).expect("wrong subcommand"))
    }

    pub fn parse_subcmd<T>(cmd: &str) -> T
    where
        T: TryFrom<Command>,
        T::Error: std::fmt::Debug,
    {
        try_parse_subcmd(cmd).expect("failed to parse command")
    }

    #[test]
    fn test_no_subcommand() {
        let result = try_parse_args("clonal");

        assert_eq!(
            result.unwrap_err().kind(),
            ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = try_parse_args("clonal -q -v diversity a.tsv");

        assert_eq!(result.unwrap_err().kind(), ClapErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_verbosity_count() {
        let cli = try_parse_args("clonal -vv overlap a.tsv b.tsv").unwrap();

        assert_eq!(cli.verbose, 2);
    }
}
