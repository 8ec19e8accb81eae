mod cli;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use vcr_cli::config::{BuildInfo, CliConfig};
use vcr_cli::{ui, update};

fn main() {
    let args = cli::Args::parse();

    // RUST_LOG wins over --verbose
    let default_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            ui::failure(format!("Failed to create Tokio runtime: {e}"));
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main(args)) {
        ui::failure(format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn real_main(args: cli::Args) -> Result<()> {
    let build = BuildInfo::from_build_env();

    if args.version {
        ui::info(build.describe());
        return Ok(());
    }

    match args.sub {
        Some(cli::Cmd::Update { force }) => {
            let config = CliConfig::load(args.config.as_deref())?;
            let timeout = args.timeout.map(Duration::from_secs);
            update::run_update(&build, &config, force, timeout).await
        }
        Some(cli::Cmd::Version) => {
            ui::info(build.describe());
            Ok(())
        }
        None => {
            use clap::CommandFactory;
            cli::Args::command().print_help()?;
            Ok(())
        }
    }
}
