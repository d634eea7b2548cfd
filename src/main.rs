//! `proxy-agent` binary: CLI entry point for the node agent.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use proxy_agent::config::loader::load_config;
use proxy_agent::config::schema::DnsOverrides;
use proxy_agent::lifecycle::startup;
use proxy_agent::observability::init_logging;

const DEFAULT_CONFIG_PATH: &str = "/etc/proxy-agent/config.toml";

#[derive(Parser)]
#[command(name = "proxy-agent", about = "Network-proxy node agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent
    Serve {
        /// Config file path
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Watch the config file and hot-reload on change
        #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
        watch: bool,
    },
    /// Print version info
    Version,
}

fn print_version() {
    println!(
        "{} {} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION"),
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            print_version();
            ExitCode::SUCCESS
        }
        Commands::Serve { config, watch } => serve(config, watch).await,
    }
}

async fn serve(config_path: PathBuf, watch: bool) -> ExitCode {
    print_version();

    let dns = DnsOverrides::from_env();
    let config = match load_config(&config_path, &dns) {
        Ok(config) => config,
        Err(e) => {
            // Logging is not configured yet; report on stderr directly.
            eprintln!("Failed to load config {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    // Held for the process lifetime so file logs flush.
    let _log_guard = match init_logging(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize log sink: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(config = %config_path.display(), "proxy-agent starting");

    match startup::run(&config_path, config, dns, watch).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}
