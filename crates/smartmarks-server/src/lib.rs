pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod realtime;
pub mod service;

use axum::{extract::Request, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::auth::AuthManager;
use crate::config::{Config, LogFormat};
use crate::db::{BookmarkRepository, Database, MemoryBookmarkRepository};
use crate::realtime::FeedHub;
use crate::service::BookmarkService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookmarkService>,
    pub feed: FeedHub,
    pub auth: Arc<AuthManager>,
    pub trusted_callback: bool,
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("smartmarks_server=info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

/// Wire the store, change feed and session manager together
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let repo: Arc<dyn BookmarkRepository> = match &config.database_url {
        Some(url) => {
            let db = Database::connect(url).await?;
            db.migrate().await?;
            tracing::info!("Using Postgres bookmark store");
            Arc::new(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; bookmarks are kept in memory");
            Arc::new(MemoryBookmarkRepository::new())
        }
    };

    let feed = FeedHub::new(config.feed_capacity);
    let service = Arc::new(BookmarkService::new(repo, feed.clone()));

    Ok(AppState {
        service,
        feed,
        auth: Arc::new(AuthManager::new(config)),
        trusted_callback: config.trusted_callback,
    })
}

pub fn app_router(state: AppState) -> Router {
    // Spans carry the path only; the feed route takes its token in the query
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::debug_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
        )
    });

    Router::new()
        .merge(api::router())
        .merge(realtime::router())
        .layer(trace)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the server with the given configuration
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let app = app_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
