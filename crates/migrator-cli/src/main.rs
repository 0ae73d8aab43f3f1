//! Migrator - command-line front end for the migration engine.
//!
//! Resolves a task name, loads configuration and hands off to the core
//! dispatcher. Failures are printed and mapped to an exit code.

mod cli;
mod console;

use clap::Parser;
use cli::Args;
use console::{render_error, ConsoleReporter, GuardHook};
use migrator_core::{Dispatcher, MigratorError, Reporter, TaskOutcome};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter);

    match run(&args, reporter.clone()) {
        Ok(TaskOutcome::Completed) => ExitCode::SUCCESS,
        Ok(TaskOutcome::Aborted) => {
            debug!("Run stopped before the task started");
            ExitCode::SUCCESS
        }
        Err(err) => {
            reporter.error(&render_error(&err));
            exit_code_for(&err)
        }
    }
}

fn run(args: &Args, reporter: Arc<dyn Reporter>) -> migrator_core::Result<TaskOutcome> {
    let config = args.to_config()?;
    debug!(
        "Using migrations in {} with registry table {}",
        config.migrations_dir.display(),
        config.registry_table
    );

    let task = args.task.as_deref();
    let name = args.name.as_deref();
    if args.protected {
        Dispatcher::with_hook(config, reporter, GuardHook).run(task, name)
    } else {
        Dispatcher::new(config, reporter).run(task, name)
    }
}

fn exit_code_for(err: &MigratorError) -> ExitCode {
    u8::try_from(err.exit_code())
        .map(ExitCode::from)
        .unwrap_or(ExitCode::FAILURE)
}
