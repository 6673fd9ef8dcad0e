use clap::Parser;

use alttoot::cli::{self, Cli, Command};
use alttoot::config;
use alttoot::logging::{self, LoggingConfig};

#[tokio::main]
async fn main() {
    let dotenv = config::load_dotenv();
    let cli = Cli::parse();

    if let Some(Command::Version) = cli.command {
        cli::handle_version();
        return;
    }

    let logging_config = LoggingConfig {
        format: cli.settings.log_format,
        ..LoggingConfig::default()
    };
    if let Err(e) = logging::init_logging(&logging_config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    match dotenv {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read environment file"),
    }

    let config = match cli.settings.to_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => cli::handle_run(config).await,
        Command::Check => cli::handle_check(&config).await,
        Command::Config => cli::handle_config_show(&config),
        Command::Version => Ok(()),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
