//! Command implementations for hasp.
//!
//! This module routes CLI commands to their implementations. The lock
//! engine itself never blocks; the wait/retry policy for `run` lives here,
//! on the caller side, as a poll loop with a bounded deadline.

use crate::cli::{Cli, ClearArgs, Command, RunArgs, StatusArgs};
use chrono::Duration;
use globset::Glob;
use hasp::config::Config;
use hasp::error::{HaspError, Result};
use hasp::lock::Lock;
use hasp::store::FileLockStore;
use hasp::store::inspect::{clear_lock, list_locks, lock_status};
use std::thread;
use std::time::Instant;

/// Characters that mark a clear pattern as a glob rather than a name.
const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let mut config = Config::discover(cli.config.as_deref())?;
    if let Some(dir) = cli.dir {
        config.lock_dir = dir;
    }

    let store = FileLockStore::new(config.lock_dir.clone());

    match cli.command {
        Command::List => cmd_list(&store, &config),
        Command::Status(args) => cmd_status(&store, &config, args),
        Command::Clear(args) => cmd_clear(&store, &config, args),
        Command::Run(args) => cmd_run(store, &config, args),
    }
}

fn cmd_list(store: &FileLockStore, config: &Config) -> Result<()> {
    let locks = list_locks(store, config.stale_after())?;

    if locks.is_empty() {
        println!("No active locks in {}", store.dir().display());
        return Ok(());
    }

    for lock in locks {
        println!("{}", lock);
    }

    Ok(())
}

fn cmd_status(store: &FileLockStore, config: &Config, args: StatusArgs) -> Result<()> {
    match lock_status(store, &args.name, config.stale_after())? {
        Some(info) => println!("{}", info),
        None => println!("{}: not locked", args.name),
    }

    Ok(())
}

fn cmd_clear(store: &FileLockStore, config: &Config, args: ClearArgs) -> Result<()> {
    if !args.force {
        return Err(HaspError::UserError(format!(
            "refusing to clear '{}' without --force",
            args.pattern
        )));
    }

    if !args.pattern.contains(GLOB_CHARS) {
        let cleared = clear_lock(store, &args.pattern, config.stale_after())?;
        println!("Cleared {}", cleared);
        return Ok(());
    }

    let matcher = Glob::new(&args.pattern)
        .map_err(|e| HaspError::UserError(format!("invalid glob '{}': {}", args.pattern, e)))?
        .compile_matcher();

    let matching: Vec<_> = list_locks(store, config.stale_after())?
        .into_iter()
        .filter(|info| matcher.is_match(&info.name))
        .collect();

    if matching.is_empty() {
        println!("No locks matched '{}'", args.pattern);
        return Ok(());
    }

    for info in matching {
        let cleared = clear_lock(store, &info.name, config.stale_after())?;
        println!("Cleared {}", cleared);
    }

    Ok(())
}

fn cmd_run(store: FileLockStore, config: &Config, args: RunArgs) -> Result<()> {
    let argv = shell_words::split(&args.command).map_err(|e| {
        HaspError::UserError(format!("failed to parse command '{}': {}", args.command, e))
    })?;
    let Some((program, rest)) = argv.split_first() else {
        return Err(HaspError::UserError("empty command".to_string()));
    };

    let max_age = match args.max_age {
        Some(seconds) if seconds == 0 => {
            return Err(HaspError::UserError(
                "invalid --max-age: must be positive".to_string(),
            ));
        }
        Some(seconds) => Duration::seconds(seconds as i64),
        None => config.default_max_age(),
    };

    let mut lock = Lock::new(store, &args.name, max_age)?;
    let deadline = args
        .wait
        .map(|seconds| Instant::now() + std::time::Duration::from_secs(seconds));

    let guard = loop {
        let attempt = if args.break_stale {
            lock.hold_breaking_stale()
        } else {
            lock.hold()
        };

        match attempt {
            Ok(guard) => break guard,
            Err(HaspError::Contended(msg)) => match deadline {
                Some(limit) if Instant::now() < limit => thread::sleep(config.poll_interval()),
                _ => return Err(HaspError::Contended(msg)),
            },
            Err(e) => return Err(e),
        }
    };

    let status = std::process::Command::new(program)
        .args(rest)
        .status()
        .map_err(|e| HaspError::UserError(format!("failed to run '{}': {}", program, e)));

    // Surface release errors only after the child's outcome is known.
    let released = guard.release();
    let status = status?;
    released?;

    if !status.success() {
        return Err(HaspError::UserError(format!(
            "command '{}' exited with {}",
            args.command, status
        )));
    }

    Ok(())
}
