use clap::Parser;
use davsync::config::Cli;
use davsync::Config;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = davsync::logging::init(cli.verbose) {
        eprintln!("Warning: could not initialize logging: {}", e);
    }

    // Convert CLI args to Config - this validates immediately
    let config = match Config::try_from(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    match davsync::commands::sync::run(config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            eprintln!("Error: {}", e);
            ExitCode::from(if e.is_config_error() { 2 } else { 1 })
        }
    }
}
