use std::{path::PathBuf, process, sync::Arc};

use clap::{Parser, Subcommand};
use colored::Colorize;
use sticky_lib::{
    Error,
    repository::config::CoreConfig,
    window::Workspace,
};
use sysexits::ExitCode;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::terminal::TerminalSink;

mod note;
mod terminal;
mod watch;

#[derive(Parser, Debug)]
#[command(name = "sticky")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Use this configuration file instead of the default one
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    #[command(flatten)]
    Note(note::Command),
    /// Keep a board open, reloading on changes and printing reminders until interrupted
    Watch {
        /// Reload from the store on every tick, for stores written by other processes
        #[arg(long)]
        poll: bool,
    },
}

fn main() -> process::ExitCode {
    // Human friendly panicking in release mode
    human_panic::setup_panic!();

    // Logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Logging is unavailable");
    }

    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            exit_code(&err)
        }
    };

    code.into()
}

fn run(cli: &Cli) -> sticky_lib::Result<ExitCode> {
    let cfg = match &cli.config {
        Some(path) => CoreConfig::load_from(path)?,
        None => CoreConfig::load()?,
    };
    debug!("Using {:?} store backend", cfg.store.backend);

    let workspace = Workspace::open(cfg.into_handle(), Arc::new(TerminalSink))?;

    match &cli.command {
        Command::Note(cmd) => note::handle(&workspace, cmd),
        Command::Watch { poll } => watch::handle(&workspace, *poll),
    }
}

fn exit_code(err: &Error) -> ExitCode {
    match err {
        Error::InvalidReminder(_) | Error::InvalidDelta => ExitCode::DataErr,
        Error::IncorrectPassword => ExitCode::NoPerm,
        Error::Config(_) => ExitCode::Config,
        Error::Store(_) => ExitCode::IoErr,
        Error::Capture(_) => ExitCode::Unavailable,
        Error::Hash(_) => ExitCode::Software,
    }
}
