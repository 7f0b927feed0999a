//! Populate / cleanup commands

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::runtime::lifetime::StartupContext;

pub async fn populate_pool(
    ctx: &StartupContext,
    count: Option<usize>,
    force: bool,
) -> Result<(), CliError> {
    let report = ctx.population.run_with(force, count).await?;

    if report.skipped {
        println!(
            "{} Key pool is healthy ({} unused keys), nothing to do. Use --force to populate anyway.",
            "ℹ".bold().blue(),
            report.unused_before
        );
        return Ok(());
    }

    println!(
        "{} Inserted {} keys ({} duplicates skipped)",
        "✓".bold().green(),
        report.inserted.to_string().cyan(),
        report.duplicates
    );
    if report.failed_chunks > 0 {
        println!(
            "{} {} chunks failed to insert, see logs",
            "⚠".bold().yellow(),
            report.failed_chunks
        );
    }
    Ok(())
}

pub async fn run_cleanup(ctx: &StartupContext) -> Result<(), CliError> {
    let report = ctx.cleanup.run_once().await?;

    println!(
        "{} Deleted {} expired mappings in {} batches",
        "✓".bold().green(),
        report.deleted.to_string().cyan(),
        report.batches
    );
    if report.cache_failures > 0 {
        println!(
            "{} {} cache entries could not be invalidated; they expire within the cache TTL",
            "⚠".bold().yellow(),
            report.cache_failures
        );
    }
    Ok(())
}
