mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::AnyError;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    // Logs go to stderr so `plan --json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch(args) => match commands::fetch(cli.config, &args).await {
            Ok(_) => println!("The map has successfully been created"),
            Err(e) => {
                error!(code = e.code(), error = %e, "Map generation failed");
                eprintln!(
                    "Could not generate the image - try adjusting the zoom level and checking your coordinates. Cause: {e}"
                );
                std::process::exit(1);
            }
        },
        Commands::Plan(args) => print!("{}", commands::plan(cli.config, &args)?),
        Commands::Config => print!("{}", commands::show_config(cli.config)?),
    }

    Ok(())
}
