//! Job-Posting Monitor — Binary Entrypoint
//! Boots the pipeline (registry, stores, scheduler, notifier mux), spawns the
//! monitor loop and flush ticker, then serves the diagnostics API.
//!
//! See `README.md` for quickstart and `DESIGN.md` for architecture notes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobhunt_monitor::api::{self, AppState};
use jobhunt_monitor::config::{AppConfig, SourcesConfig};
use jobhunt_monitor::metrics::Metrics;
use jobhunt_monitor::monitor::{Monitor, MonitorCfg};
use jobhunt_monitor::notify::{Notifier, NotifierMux};
use jobhunt_monitor::schedule::{NotificationScheduler, SchedulerCfg};
use jobhunt_monitor::sources::SourceRegistry;
use jobhunt_monitor::store::prefs::PrefsStore;
use jobhunt_monitor::store::seen::SeenStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env();
    let metrics = Metrics::init(cfg.check_interval_secs);

    let sources_cfg = SourcesConfig::load_default().context("loading sources config")?;
    let registry = SourceRegistry::from_config(&sources_cfg);
    tracing::info!(sources = registry.len(), "source registry ready");

    let seen = Arc::new(SeenStore::load(cfg.seen_path()).context("loading seen store")?);
    tracing::info!(seen = seen.len(), "dedup store loaded");
    let prefs = Arc::new(PrefsStore::load(cfg.prefs_path()).context("loading preferences store")?);
    tracing::info!(users = prefs.user_count(), "preferences store loaded");

    let scheduler = Arc::new(NotificationScheduler::new(SchedulerCfg {
        digest_threshold: cfg.digest_threshold,
        digest_max_age_secs: cfg.digest_max_age_secs,
    }));

    let mux = NotifierMux::from_env();
    if mux.is_empty() {
        tracing::warn!("no notification sinks configured; batches will only be logged");
    }
    let notifier: Arc<dyn Notifier> = Arc::new(mux);

    let monitor = Arc::new(Monitor::new(
        registry,
        seen,
        prefs,
        scheduler,
        notifier,
        MonitorCfg {
            check_interval: Duration::from_secs(cfg.check_interval_secs),
            fetch_timeout: Duration::from_secs(cfg.fetch_timeout_secs),
        },
    ));
    let _monitor_loop = monitor.spawn();
    let _flush_ticker = monitor.spawn_flush_ticker(Duration::from_secs(cfg.flush_tick_secs));

    let router = api::create_router(AppState {
        monitor: Arc::clone(&monitor),
    })
    .merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "serving");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
