use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod acquire;
mod cli;
mod constants;
mod coordinator;
mod extract;
mod logger;
mod models;
mod options;
mod outcome;
mod pipeline;
mod report;
mod session;

#[cfg(test)]
mod test_utils;

use cli::Args;
use coordinator::Coordinator;
use pipeline::{DefaultFactory, InterruptFlag};

fn main() {
    let args = Args::parse();

    if let Err(e) = initialize_logging(&args) {
        eprintln!("{e:#}");
        process::exit(constants::EXIT_UNDEFINED);
    }

    match run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            log::error!("{e:#}");
            process::exit(constants::EXIT_UNDEFINED);
        }
    }
}

fn run(args: Args) -> Result<i32> {
    let targets = args.resolve_targets()?;
    if targets.is_empty() {
        bail!("no targets to process");
    }
    let options = args.pipeline_options();

    let interrupt = InterruptFlag::new();
    install_interrupt_handler(interrupt.clone());

    let factory = Arc::new(DefaultFactory::new(args.port));
    let summary = Coordinator::new(targets, options, factory, interrupt).run();
    Ok(summary.exit_code())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(args: &Args) -> Result<()> {
    let log_level = if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Trip the shared interruption flag on the first SIGINT.
///
/// The handler itself only stores a flag; a watcher thread propagates it,
/// since nothing async-signal-unsafe may run inside the handler. Pipelines
/// observe the flag at their next stage boundary.
#[cfg(unix)]
fn install_interrupt_handler(flag: InterruptFlag) {
    static SIGINT_SEEN: AtomicBool = AtomicBool::new(false);

    extern "C" fn on_sigint(_: libc::c_int) {
        SIGINT_SEEN.store(true, Ordering::SeqCst);
    }

    unsafe {
        libc::signal(
            libc::SIGINT,
            on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }

    thread::spawn(move || loop {
        if SIGINT_SEEN.load(Ordering::SeqCst) {
            log::warn!("Interrupted, stopping at the next stage boundary");
            flag.trip();
            break;
        }
        thread::sleep(Duration::from_millis(100));
    });
}

#[cfg(not(unix))]
fn install_interrupt_handler(_flag: InterruptFlag) {}
