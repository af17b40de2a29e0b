//! PinVault CLI
//!
//! Command-line front end over `pinvault-core`: publish keyword-addressed
//! notes behind a passcode, guess other people's, and run the maintenance
//! tasks (grace sweep, notification flush, integrity check, backup) a
//! deployment schedules.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod helpers;
mod output;
mod ui;

use clap::{CommandFactory, Parser};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::app::AppContext;
use crate::cli::{Cli, Commands, NotificationCommands};
use crate::constants::LOG_ENV;
use crate::errors::exit_code_for;

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Init(args) => commands::handle_init(cli, args),
        Commands::Completions { shell } => commands::handle_completions(*shell),
        command => {
            let ctx = AppContext::new(cli)?;
            match command {
                Commands::Create(args) => commands::handle_create(&ctx, args),
                Commands::Show(args) => commands::handle_show(&ctx, args),
                Commands::List => commands::handle_list(&ctx),
                Commands::Challenge(args) => commands::handle_challenge(&ctx, args),
                Commands::SetPasscode(args) => commands::handle_set_passcode(&ctx, args),
                Commands::Edit(args) => commands::handle_edit(&ctx, args),
                Commands::Notify(args) => commands::handle_notify(&ctx, args),
                Commands::Upgrade(args) => commands::handle_upgrade(&ctx, args),
                Commands::Grant(args) => commands::handle_grant(&ctx, args),
                Commands::Sweep => commands::handle_sweep(&ctx),
                Commands::Delete(args) => commands::handle_delete(&ctx, args),
                Commands::Check => commands::handle_check(&ctx),
                Commands::Backup(args) => commands::handle_backup(&ctx, args),
                Commands::Notifications(NotificationCommands::Flush) => {
                    commands::handle_flush(&ctx)
                }
                Commands::Init(_) | Commands::Completions { .. } => Ok(()),
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(exit_code_for(&err));
    }
}
