use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bd_cli::commands::{flatten, run, summary, util};
use bd_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so stdout stays parseable with --json.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let breakdown_config = config.breakdown_config(cli.threads);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Commands::Run { input, json } => {
            let input = util::read_input(input)?;
            run::run(&mut out, &input, &breakdown_config, *json)?;
        }
        Commands::Flatten { input, json } => {
            let input = util::read_input(input)?;
            flatten::run(&mut out, &input, &breakdown_config, *json)?;
        }
        Commands::Summary { input, json } => {
            let input = util::read_input(input)?;
            summary::run(&mut out, &input, &breakdown_config, *json)?;
        }
    }
    out.flush()?;

    Ok(())
}
