//! ovlcheck - copy-up identity conformance checker for layered filesystems.
//!
//! Provides commands for:
//! - Running the scenario suite against a mounted filesystem
//! - Seeding a lower layer with the fixtures the suite expects
//! - Listing the scenario catalog

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harness::{fixtures, ConsoleReporter, Suite, SuiteConfig, Trigger};
use log::{debug, info};

/// Copy-up identity conformance checker for layered filesystems.
#[derive(Parser)]
#[command(name = "ovlcheck")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenario suite against a directory on the mounted filesystem
    Run {
        /// Directory under test, holding the seeded fixtures
        #[arg(env = "OVLCHECK_BASE")]
        base: PathBuf,

        /// Only run the copy-up scenarios for these triggers (repeatable)
        #[arg(long, value_name = "TRIGGER")]
        only: Vec<Trigger>,

        /// Skip the getdents64 enumeration check
        #[arg(long)]
        no_enumeration: bool,

        /// Directory the enumeration check lists (default: BASE)
        #[arg(long, value_name = "DIR")]
        enumeration_dir: Option<PathBuf>,

        /// Regular file the enumeration check expects to find
        #[arg(long, value_name = "NAME", default_value = fixtures::ENUMERATION_ENTRY)]
        enumeration_entry: String,
    },

    /// Write every fixture into a directory, typically the lower layer before mounting
    Seed {
        /// Directory to populate
        dir: PathBuf,
    },

    /// List the scenarios in run order
    List,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Run {
            base,
            only,
            no_enumeration,
            enumeration_dir,
            enumeration_entry,
        } => {
            let mut config = SuiteConfig::new(base)
                .only(only)
                .enumeration(!no_enumeration)
                .enumeration_entry(enumeration_entry);
            if let Some(dir) = enumeration_dir {
                config = config.enumeration_dir(dir);
            }
            cmd_run(config)
        }

        Commands::Seed { dir } => cmd_seed(&dir),

        Commands::List => cmd_list(),
    }
}

fn cmd_run(config: SuiteConfig) -> Result<ExitCode> {
    debug!("configuration: {:?}", config);

    let base = config.base.clone();
    let suite = Suite::standard(config)
        .with_context(|| format!("cannot use {} as the directory under test", base.display()))?;

    let report = suite.run(&mut ConsoleReporter::stdio());
    if let Some((name, failure)) = report.failure() {
        info!("{} failed: {:?}", name, failure);
    }

    Ok(ExitCode::from(report.exit_code() as u8))
}

fn cmd_seed(dir: &Path) -> Result<ExitCode> {
    let written = fixtures::seed(dir)
        .with_context(|| format!("failed to seed fixtures in {}", dir.display()))?;

    for path in written {
        println!("{}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_list() -> Result<ExitCode> {
    for trigger in Trigger::ALL {
        println!(
            "{:<18} {:<10} {}",
            trigger.scenario_name(),
            trigger.name(),
            trigger.fixture()
        );
    }
    println!(
        "{:<18} {:<10} {}",
        harness::enumeration::SCENARIO_NAME,
        "-",
        fixtures::ENUMERATION_ENTRY
    );

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "ovlcheck",
            "-vv",
            "run",
            "/mnt/overlay",
            "--only",
            "rename",
            "--only",
            "write",
            "--no-enumeration",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run {
                base,
                only,
                no_enumeration,
                enumeration_entry,
                ..
            } => {
                assert_eq!(base, PathBuf::from("/mnt/overlay"));
                assert_eq!(only, vec![Trigger::Rename, Trigger::ContentWrite]);
                assert!(no_enumeration);
                assert_eq!(enumeration_entry, "test.txt");
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_unknown_trigger_is_rejected() {
        assert!(Cli::try_parse_from(["ovlcheck", "run", "/mnt", "--only", "mkdir"]).is_err());
    }
}
