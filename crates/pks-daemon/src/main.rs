//! pks-daemon entry point.
//!
//! Thin on purpose: load config, set up tracing, start the run runtime, wire
//! middleware, serve. Route handlers live in `routes.rs`; shared state in
//! `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use pks_config::{
    config_paths_from_env, load_layered_yaml, report_unused_keys, ConfigScope, DaemonConfig,
    LoadedConfig, UnusedKeyPolicy,
};
use pks_daemon::{routes, state};
use pks_feed::CsvRecordFeed;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = load_config()?;
    let report = report_unused_keys(ConfigScope::Daemon, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config keys not read by the daemon");
    }
    let config = DaemonConfig::from_loaded(&loaded)
        .context("invalid daemon config")?
        .with_env_overrides();

    let (shared, _tasks) = state::AppState::start(config.clone(), Arc::new(CsvRecordFeed::new()));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive());

    info!(
        service = shared.build.service,
        version = shared.build.version,
        config_hash = %loaded.config_hash,
        await_timeout_secs = config.await_timeout.as_secs(),
        dataset = %config.default_dataset_path,
        "pks-daemon listening on http://{}",
        config.bind_addr
    );

    axum::serve(tokio::net::TcpListener::bind(config.bind_addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Layered YAML from `PKS_CONFIG`, or built-in defaults when unset.
fn load_config() -> anyhow::Result<LoadedConfig> {
    let paths = config_paths_from_env();
    if paths.is_empty() {
        return LoadedConfig::empty();
    }
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    load_layered_yaml(&refs).context("load daemon config")
}
