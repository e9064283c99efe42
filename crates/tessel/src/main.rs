mod cli;
mod commands;
mod config;
mod error;
mod output;
mod session;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::session::Session;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;
    match cli.command {
        // Local commands need no API connection
        Command::Config(args) => commands::config_cmd::handle(&args, &global),
        Command::Schemas => commands::schemas::handle(&global),
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "tessel", &mut std::io::stdout());
            Ok(())
        }

        Command::Get(args) => {
            let session = connect(&global).await?;
            let result = commands::get::handle(args, &session, &global).await;
            session.shutdown().await;
            result
        }
        Command::List(args) => {
            let session = connect(&global).await?;
            let result = commands::list::handle(args, &session, &global).await;
            session.shutdown().await;
            result
        }
    }
}

/// Load the effective config and start a session against the API.
async fn connect(global: &cli::GlobalOpts) -> Result<Session, CliError> {
    let cfg = config::load(global)?;
    let path = config::active_path(global).display().to_string();
    Session::start(&cfg, &path).await
}
