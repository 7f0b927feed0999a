//! Generate / validate config commands

use colored::Colorize;

use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;

/// Generate example configuration file
pub async fn generate_config(output_path: Option<String>) -> Result<(), CliError> {
    let path = output_path.unwrap_or_else(|| "shortpool.example.toml".to_string());

    println!(
        "{} {}",
        "Generating configuration file...".yellow(),
        path.blue()
    );

    let config = StaticConfig::default();
    match config.save_to_file(&path) {
        Ok(()) => {
            println!(
                "  {} {}",
                "Configuration file generated successfully".green(),
                path.blue()
            );
            Ok(())
        }
        Err(e) => {
            println!(
                "  {} {}",
                "Failed to generate configuration file".red(),
                e.to_string().red()
            );
            Err(CliError::CommandError(format!(
                "Unable to write configuration file: {}",
                e
            )))
        }
    }
}

/// Validate the loaded configuration
pub fn validate_config(config: &StaticConfig) -> Result<(), CliError> {
    config.validate()?;
    println!("{} Configuration is valid", "✓".bold().green());
    println!(
        "  {}: {} symbols, length {}",
        "Keys".cyan(),
        config.keys.alphabet.chars().count(),
        config.keys.length
    );
    println!(
        "  {}: {}",
        "Database".cyan(),
        config.database.database_url.dimmed()
    );
    println!("  {}: {}", "Cache".cyan(), config.cache.cache_type);
    Ok(())
}
