//! Serve command - runs the HTTP API over one cache engine

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use clap::Args;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::api::{create_router, AppState};
use crate::config::AppConfig;
use crate::infrastructure::logging::LoggingConfig;
use crate::infrastructure::observability::{
    create_metrics_router, init_metrics, init_tracing, shutdown_tracing,
};
use crate::infrastructure::services::CacheEngine;
use crate::infrastructure::snapshot_file::{read_snapshot, write_snapshot};

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Snapshot file loaded at start and written on shutdown (overrides config)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load().context("failed to load configuration")?;
    apply_overrides(&mut config, &args);

    init_tracing(&LoggingConfig::from(&config), &config.observability.tracing);

    let engine = crate::build_engine(&config)?;
    let snapshot_path = config.snapshot.path.clone();

    if let Some(path) = snapshot_path.as_deref().filter(|_| config.snapshot.load_on_start) {
        load_snapshot(&engine, path).await;
    }

    let sweep = engine.spawn_expiry_sweep(Duration::from_secs(config.server.expiry_sweep_secs.max(1)));

    let mut app = create_router(AppState::new(engine.clone()));

    if let Some(metrics) = init_metrics(&config.observability.metrics) {
        app = app.merge(create_metrics_router(metrics, &config.observability.metrics.path));
    }

    let addr = build_socket_addr(&config)?;
    info!("Starting CAG cache on {}", addr);

    serve(app, addr).await?;

    if let Some(handle) = sweep {
        handle.abort();
    }

    if let Some(path) = snapshot_path.as_deref().filter(|_| config.snapshot.save_on_shutdown) {
        save_snapshot(&engine, path).await;
    }

    shutdown_tracing();
    info!("CAG cache shutdown complete");

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &ServeArgs) {
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Some(ref path) = args.snapshot {
        config.snapshot.path = Some(path.clone());
        config.snapshot.load_on_start = true;
        config.snapshot.save_on_shutdown = true;
    }
}

async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// A missing or invalid snapshot leaves the cache empty instead of aborting start-up
async fn load_snapshot(engine: &Arc<CacheEngine>, path: &Path) {
    if !path.exists() {
        info!(path = %path.display(), "No snapshot to load");
        return;
    }

    match read_snapshot(path).await.and_then(|s| engine.import_cache(s)) {
        Ok(summary) => info!(
            path = %path.display(),
            imported = summary.imported,
            embeddings = summary.embeddings,
            "Snapshot loaded"
        ),
        Err(e) => warn!(path = %path.display(), error = %e, "Snapshot not loaded"),
    }
}

async fn save_snapshot(engine: &Arc<CacheEngine>, path: &Path) {
    let snapshot = match engine.export_cache() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(error = %e, "Failed to export cache for snapshot");
            return;
        }
    };

    match write_snapshot(path, &snapshot).await {
        Ok(()) => info!(path = %path.display(), entries = snapshot.len(), "Snapshot saved"),
        Err(e) => error!(path = %path.display(), error = %e, "Failed to write snapshot"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::generation::CountingPipeline;
    use crate::domain::CagRequest;

    fn engine() -> Arc<CacheEngine> {
        Arc::new(CacheEngine::new(
            Arc::new(MockEmbeddingProvider::new(8)),
            Arc::new(CountingPipeline::new()),
        ))
    }

    #[test]
    fn test_snapshot_flag_enables_load_and_save() {
        let mut config = AppConfig::default();
        let args = ServeArgs {
            port: Some(3000),
            snapshot: Some(PathBuf::from("/tmp/cache.json")),
        };

        apply_overrides(&mut config, &args);

        assert_eq!(config.server.port, 3000);
        assert!(config.snapshot.load_on_start);
        assert!(config.snapshot.save_on_shutdown);
    }

    #[test]
    fn test_build_socket_addr_rejects_bad_host() {
        let mut config = AppConfig::default();
        config.server.host = "not-an-ip".to_string();

        assert!(build_socket_addr(&config).is_err());
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart() {
        let path = std::env::temp_dir().join(format!("cag-serve-{}.json", uuid::Uuid::new_v4()));

        let first = engine();
        first.query(CagRequest::new("What is XSS?")).await.unwrap();
        save_snapshot(&first, &path).await;

        let second = engine();
        load_snapshot(&second, &path).await;

        assert_eq!(second.get_cache_stats().unwrap().cache_size, 1);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_snapshot_leaves_cache_empty() {
        let engine = engine();
        load_snapshot(&engine, Path::new("/nonexistent/cag/cache.json")).await;

        assert_eq!(engine.get_cache_stats().unwrap().cache_size, 0);
    }
}
