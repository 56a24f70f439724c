//! steprun CLI binary entry point.

use clap::Parser;
use steprun::cli::{Cli, Commands, Outcome};

#[tokio::main]
async fn main() {
    steprun::cli::logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => steprun::cli::handle_run(args).await,
    };

    match result {
        Ok(Outcome::Completed) => {}
        Ok(Outcome::Failed) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
