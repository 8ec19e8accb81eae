use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vcr", about = "Vonage Cloud Runtime CLI", disable_version_flag = true)]
pub struct Args {
    /// Print version information and exit
    #[arg(short = 'V', long)]
    pub version: bool,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Overall deadline for network operations, in seconds
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Show and update VCR CLI version
    ///
    /// If the current version is not the latest, the option to update will be provided.
    Update {
        /// Force update and skip prompt if new update exists
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// Print version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_update_force() {
        let args = Args::try_parse_from(["vcr", "update", "-f", "--timeout", "30"]).unwrap();
        assert!(matches!(args.sub, Some(Cmd::Update { force: true })));
        assert_eq!(args.timeout, Some(30));

        let args = Args::try_parse_from(["vcr", "update"]).unwrap();
        assert!(matches!(args.sub, Some(Cmd::Update { force: false })));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(Args::try_parse_from(["vcr", "--timeout", "0", "update"]).is_err());
    }
}
