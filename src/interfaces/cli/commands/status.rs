//! Stats command

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::interfaces::cli::CliError;
use crate::runtime::lifetime::StartupContext;
use crate::storage::{KeyPool, MappingStats, MappingStore, PoolStats};

#[derive(Serialize)]
struct StatsOutput {
    pool: PoolStats,
    mappings: MappingStats,
    low_water_mark: u64,
}

pub async fn show_stats(
    ctx: &StartupContext,
    low_water_mark: u64,
    json: bool,
) -> Result<(), CliError> {
    let pool = ctx.storage.pool_stats().await?;
    let mappings = ctx.storage.mapping_stats(Utc::now()).await?;

    if json {
        let output = StatsOutput {
            pool,
            mappings,
            low_water_mark,
        };
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::CommandError(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", "Key Pool".bold().green());
    println!(
        "  {}:   {}",
        "Unused".cyan(),
        if pool.unused < low_water_mark {
            pool.unused.to_string().yellow()
        } else {
            pool.unused.to_string().green()
        }
    );
    println!("  {}:  {}", "Claimed".cyan(), pool.claimed);
    println!("  {}:    {}", "Total".cyan(), pool.total);
    println!("  {}: {}", "Low-water".cyan(), low_water_mark);

    println!("{}", "Mappings".bold().green());
    println!("  {}:    {}", "Total".cyan(), mappings.total);
    println!(
        "  {}:  {}",
        "Expired".cyan(),
        if mappings.expired > 0 {
            mappings.expired.to_string().yellow()
        } else {
            mappings.expired.to_string().normal()
        }
    );
    Ok(())
}
