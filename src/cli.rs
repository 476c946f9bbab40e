//! CLI argument parsing for hasp.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hasp: file-backed cooperative locks with expiry, renewal, and
/// stale-lock breaking.
///
/// Locks are JSON records in a shared directory. Any process that can see
/// the directory can contend for a lock, inspect current holders, and
/// break holders whose records have gone stale.
#[derive(Parser, Debug)]
#[command(name = "hasp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Lock directory (overrides the config file).
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Config file path (default: ./hasp.yaml when present).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for hasp.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all active locks.
    ///
    /// Shows each lock with its owner, age, and a STALE marker for
    /// records older than the configured threshold.
    List,

    /// Show the current holder of a single lock.
    ///
    /// Prints the record for the named lock, or "not locked".
    Status(StatusArgs),

    /// Clear locks matching a name or glob.
    ///
    /// Removes matching records regardless of owner. Requires --force
    /// to prevent accidental clearing.
    Clear(ClearArgs),

    /// Run a command while holding a lock.
    ///
    /// Acquires the named lock, executes the command, and releases the
    /// lock on all exit paths. Fails with the lock-failure exit code when
    /// the lock cannot be acquired.
    Run(RunArgs),
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// The lock name.
    pub name: String,
}

/// Arguments for the `clear` command.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Lock name or glob pattern (e.g. "build-*").
    pub pattern: String,

    /// Force clearing the locks (required for safety).
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The lock name.
    pub name: String,

    /// Command line to execute while holding the lock.
    pub command: String,

    /// Max age in seconds before this lock may be broken by others
    /// (default: from config).
    #[arg(long, value_name = "SECONDS")]
    pub max_age: Option<u64>,

    /// Break the current holder if its record is stale.
    #[arg(long)]
    pub break_stale: bool,

    /// Keep retrying for up to this many seconds instead of failing
    /// immediately on contention.
    #[arg(long, value_name = "SECONDS")]
    pub wait: Option<u64>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_list() {
        let cli = Cli::try_parse_from(["hasp", "list"]).unwrap();
        assert!(matches!(cli.command, Command::List));
        assert!(cli.dir.is_none());
    }

    #[test]
    fn parse_list_with_dir() {
        let cli = Cli::try_parse_from(["hasp", "--dir", "/var/lock/hasp", "list"]).unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("/var/lock/hasp")));
    }

    #[test]
    fn parse_status() {
        let cli = Cli::try_parse_from(["hasp", "status", "build"]).unwrap();
        if let Command::Status(args) = cli.command {
            assert_eq!(args.name, "build");
        } else {
            panic!("Expected Status command");
        }
    }

    #[test]
    fn parse_clear_requires_pattern() {
        assert!(Cli::try_parse_from(["hasp", "clear"]).is_err());

        let cli = Cli::try_parse_from(["hasp", "clear", "build-*", "--force"]).unwrap();
        if let Command::Clear(args) = cli.command {
            assert_eq!(args.pattern, "build-*");
            assert!(args.force);
        } else {
            panic!("Expected Clear command");
        }
    }

    #[test]
    fn parse_run_full() {
        let cli = Cli::try_parse_from([
            "hasp",
            "run",
            "deploy",
            "make release",
            "--max-age",
            "600",
            "--break-stale",
            "--wait",
            "30",
        ])
        .unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.name, "deploy");
            assert_eq!(args.command, "make release");
            assert_eq!(args.max_age, Some(600));
            assert!(args.break_stale);
            assert_eq!(args.wait, Some(30));
        } else {
            panic!("Expected Run command");
        }
    }
}
