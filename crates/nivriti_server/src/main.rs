/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use nivriti_core::StoryDb;
use nivriti_server::{load_config, router, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = load_config()?;
    let db = StoryDb::open_with(&cfg.db_path, cfg.db_options())
        .with_context(|| format!("open db {}", cfg.db_path.display()))?;
    let addr = cfg.bind;
    if cfg.admin_token.is_none() {
        info!("NIVRITI_ADMIN_TOKEN not set: admin endpoints disabled");
    }
    let app = router(AppState::new(cfg, db));

    info!("nivriti_server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}
