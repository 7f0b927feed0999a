//! CLI interface module
//!
//! One-shot operator commands. Each command builds only the components it needs.

pub mod commands;

use std::fmt;

use crate::cli::{Commands, ConfigCommands};
use crate::config::StaticConfig;
use crate::errors::ShortpoolError;
use crate::runtime::lifetime::prepare_startup;
use commands::{
    create_mapping, generate_config, populate_pool, resolve_key, run_cleanup, show_stats,
    validate_config,
};

#[derive(Debug)]
pub enum CliError {
    Engine(ShortpoolError),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::Engine(err) => err.format_simple(),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::Engine(err) => err.format_colored(),
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }

    /// 进程退出码：不存在 / 已过期 为 2，其余为 1
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Engine(ShortpoolError::NotFound(_))
            | CliError::Engine(ShortpoolError::Expired(_)) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<ShortpoolError> for CliError {
    fn from(err: ShortpoolError) -> Self {
        CliError::Engine(err)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ShortpoolError>() {
            Ok(engine) => CliError::Engine(engine),
            Err(other) => CliError::CommandError(format!("{:#}", other)),
        }
    }
}

/// Run a one-shot CLI command
///
/// `Commands::Run` is the long-running service and is dispatched by `main`.
pub async fn run_cli_command(cmd: Commands, config: &StaticConfig) -> Result<(), CliError> {
    // Config commands don't need storage
    if let Commands::Config { action } = cmd {
        return match action {
            ConfigCommands::Generate { output_path } => generate_config(output_path).await,
            ConfigCommands::Validate => validate_config(config),
        };
    }

    let ctx = prepare_startup(config).await?;

    match cmd {
        Commands::Populate { count, force } => populate_pool(&ctx, count, force).await,

        Commands::Cleanup => run_cleanup(&ctx).await,

        Commands::Create { url, expires } => create_mapping(&ctx, url, expires).await,

        Commands::Resolve { key } => resolve_key(&ctx, key).await,

        Commands::Stats { json } => {
            show_stats(&ctx, config.keys.low_water_mark, json).await
        }

        Commands::Config { .. } => unreachable!("handled above"),

        Commands::Run => Err(CliError::CommandError(
            "run is handled by the service entry point".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::from(ShortpoolError::not_found("abc")).exit_code(),
            2
        );
        assert_eq!(
            CliError::from(ShortpoolError::expired("abc")).exit_code(),
            2
        );
        assert_eq!(
            CliError::from(ShortpoolError::pool_exhausted("empty")).exit_code(),
            1
        );
        assert_eq!(CliError::ParseError("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_anyhow_preserves_engine_error() {
        let err = anyhow::Error::new(ShortpoolError::timeout("claim"));
        match CliError::from(err) {
            CliError::Engine(ShortpoolError::Timeout(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
