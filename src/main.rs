use clap::Parser;
use tracing::error;

use shortpool::cli::{Cli, Commands};
use shortpool::config::{get_config, init_config_from};
use shortpool::runtime::{lifetime, modes};
use shortpool::system::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(&cli.config);
    let config = get_config();

    let command = cli.command.unwrap_or(Commands::Run);

    // config 子命令不需要日志和存储
    #[cfg(feature = "cli")]
    if let Commands::Config { .. } = command {
        if let Err(e) = shortpool::interfaces::cli::run_cli_command(command, &config).await {
            eprintln!("{}", e.format_colored());
            std::process::exit(e.exit_code());
        }
        return;
    }

    if let Err(e) = config.validate() {
        eprintln!("{}", e.format_simple());
        std::process::exit(1);
    }

    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            std::process::exit(1);
        }
    };

    match command {
        Commands::Run => {
            let ctx = match lifetime::prepare_startup(&config).await {
                Ok(ctx) => ctx,
                Err(e) => {
                    error!("Startup failed: {:#}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = modes::run_service(ctx).await {
                error!("Service error: {:#}", e);
                std::process::exit(1);
            }
        }
        #[cfg(feature = "cli")]
        other => {
            if let Err(e) = shortpool::interfaces::cli::run_cli_command(other, &config).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(e.exit_code());
            }
        }
        #[cfg(not(feature = "cli"))]
        _ => {
            eprintln!("This build only supports the `run` command");
            std::process::exit(1);
        }
    }
}
