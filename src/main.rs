mod checks;
mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod resource;
mod schema;
mod stack;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub stack: String,
    pub config_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        stack: cli.stack,
        config_dir: cli.config_dir,
    };
    log::trace!("verbosity {}, stack '{}'", ctx.verbose, ctx.stack);

    match cli.command {
        Command::Preview(args) => commands::preview::run(&ctx, args.target.as_deref()),
        Command::Emit(args) => {
            commands::emit::run(&ctx, args.output.as_deref(), args.no_snapshot)
        }
        Command::Check => commands::check::run(&ctx),
        Command::Diff(args) => commands::diff::run(&ctx, args.details),
        Command::Graph(args) => commands::graph::run(&ctx, args.format),
        Command::Outputs => commands::outputs::run(&ctx),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "cloudstack", &mut io::stdout());
            Ok(())
        }
    }
}
