//! Create / resolve commands

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::runtime::lifetime::StartupContext;
use crate::utils::TimeParser;

pub async fn create_mapping(
    ctx: &StartupContext,
    url: String,
    expires: Option<String>,
) -> Result<(), CliError> {
    let expires_at = expires
        .as_deref()
        .map(TimeParser::parse_expire_time)
        .transpose()
        .map_err(CliError::ParseError)?;

    let created = ctx.engine.create_mapping(&url, expires_at).await?;

    if created.generated_on_demand {
        println!(
            "{} Key pool exhausted, generated key on demand",
            "ℹ".bold().blue()
        );
    }

    if let Some(expires_at) = created.expires_at {
        println!(
            "{} Created mapping: {} -> {} (expires: {})",
            "✓".bold().green(),
            created.short_key.cyan(),
            created.long_url.blue().underline(),
            expires_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string()
                .yellow()
        );
    } else {
        println!(
            "{} Created mapping: {} -> {}",
            "✓".bold().green(),
            created.short_key.cyan(),
            created.long_url.blue().underline()
        );
    }
    Ok(())
}

pub async fn resolve_key(ctx: &StartupContext, key: String) -> Result<(), CliError> {
    let resolved = ctx.engine.resolve(&key).await;
    // 过期 key 的删除在后台任务里进行，进程退出前等它完成
    ctx.engine.wait_pending_deletes().await;
    let long_url = resolved?;
    println!("{}", long_url);

    if let Some(recorder) = &ctx.hit_recorder {
        recorder.flush().await;
    }
    Ok(())
}
