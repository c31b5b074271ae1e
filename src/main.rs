mod config;
mod errors;
mod images;
mod markup;
mod repository;
mod server;
mod state;
mod store;

use crate::config::{AppConfig, StoreBackend};
use crate::errors::{JournalError, JournalResult};
use crate::images::ImageIngest;
use crate::repository::MarkupRepository;
use crate::state::AppState;
use crate::store::rest::RestEntryStore;
use crate::store::sqlite::{self, SqliteEntryStore};
use crate::store::EntryStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use server::{routes, ws};
use std::sync::Arc;
use tower::ServiceBuilder;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("carnilek journal starting");

    // Load config
    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Entry store
    let store = match open_store(&cfg) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("store init error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = cfg.legacy_cache_path.as_deref() {
        if let Err(e) = store::migrate_legacy_cache(store.as_ref(), path).await {
            tracing::error!("legacy cache migration failed: {e}");
            std::process::exit(1);
        }
    }

    let repo = MarkupRepository::new(store);
    match repo.hydrate(cfg.seed_samples).await {
        Ok(count) => tracing::info!(count, "journal loaded"),
        Err(e) => {
            tracing::error!("journal load failed: {e}");
            std::process::exit(1);
        }
    }

    let app_state = AppState::new(cfg.clone(), repo);

    // Axum HTTP + WS server
    // room for a full screenshot set as base64 inside one JSON body
    let body_limit = cfg.image_max_bytes.saturating_mul(ImageIngest::DEFAULT_MAX_PER_ENTRY * 2);
    let index = cfg.static_dir.join("index.html");

    let app = axum::Router::new()
        .route(
            "/api/markups",
            get(routes::list_markups)
                .post(routes::create_markup)
                .put(routes::replace_markups),
        )
        .route(
            "/api/markups/{id}",
            get(routes::get_markup)
                .put(routes::update_markup)
                .delete(routes::delete_markup),
        )
        .route("/api/markups/{id}/screenshots", post(routes::upload_screenshot))
        .route("/api/overview", get(routes::get_overview))
        .route("/api/years/{year}", get(routes::get_year))
        .route("/api/years/{year}/months/{month}", get(routes::get_month))
        .route("/api/days/{day}", get(routes::get_day))
        .route("/api/stats", get(routes::get_stats))
        .route("/api/vocabulary", get(routes::get_vocabulary))
        .route("/api/counters", get(routes::get_counters))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(
            tower_http::services::ServeDir::new(&cfg.static_dir)
                .fallback(tower_http::services::ServeFile::new(index)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(
                    tower_http::cors::CorsLayer::new()
                        .allow_origin(tower_http::cors::Any)
                        .allow_methods(tower_http::cors::Any)
                        .allow_headers(tower_http::cors::Any),
                ),
        )
        .with_state(app_state);

    let addr = format!("0.0.0.0:{}", cfg.server_port);
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
    }
    tracing::info!("carnilek journal stopped");
}

fn open_store(cfg: &AppConfig) -> JournalResult<Arc<dyn EntryStore>> {
    match cfg.store_backend {
        StoreBackend::Sqlite => {
            let db = sqlite::init_db(&cfg.data_dir)?;
            Ok(Arc::new(SqliteEntryStore::new(db)))
        }
        StoreBackend::Rest => {
            let (Some(url), Some(key)) = (cfg.supabase_url.as_deref(), cfg.supabase_anon_key.as_deref()) else {
                return Err(JournalError::Config("rest backend needs SUPABASE_URL and SUPABASE_ANON_KEY".into()));
            };
            tracing::info!(url, "using hosted entry store");
            Ok(Arc::new(RestEntryStore::new(url, key)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler failed: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
