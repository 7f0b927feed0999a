//! Service mode
//!
//! 常驻运行 key 池补充、过期清理和命中计数刷写，直到收到 Ctrl+C。

use anyhow::Result;
use tracing::info;

use crate::runtime::lifetime::{self, StartupContext};
use crate::workers::Shutdown;

pub async fn run_service(ctx: StartupContext) -> Result<()> {
    let shutdown = Shutdown::new();

    let mut tasks = vec![
        (
            "Population worker",
            ctx.population.clone().spawn(shutdown.subscribe()),
        ),
        (
            "Cleanup worker",
            ctx.cleanup.clone().spawn(shutdown.subscribe()),
        ),
    ];

    if let Some(recorder) = ctx.hit_recorder.clone() {
        let rx = shutdown.subscribe();
        tasks.push((
            "Hit recorder",
            tokio::spawn(async move { recorder.run(rx).await }),
        ));
    }

    info!(
        "shortpool running (storage: {}, cache: {}), press Ctrl+C to stop",
        ctx.storage.backend_name(),
        ctx.cache.backend_name()
    );

    lifetime::listen_for_shutdown().await;
    lifetime::perform_shutdown(&shutdown, tasks, ctx.hit_recorder.as_ref()).await;
    ctx.engine.wait_pending_deletes().await;

    info!("shortpool stopped");
    Ok(())
}
