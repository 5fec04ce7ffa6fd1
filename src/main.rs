//! Scheme Directory Backend
//!
//! REST backend for discovering government welfare schemes, with SQLite
//! persistence and Tantivy full-text search.

mod api;
mod auth;
mod catalog;
mod chatbot;
mod config;
mod db;
mod errors;
mod filter;
mod models;
mod pagination;
mod ratelimit;
mod search;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog::{SchemeCatalog, StorePolicy};
use config::{Config, LogFormat};
use db::{ConnectRetry, SchemeRepository};
use ratelimit::RateLimiter;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: SchemeCatalog,
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    tracing::info!("Starting Scheme Directory Backend");
    tracing::info!("Environment: {}", config.environment.as_str());
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_key.is_none() {
        if config.is_development() {
            tracing::warn!("No admin key configured (SCHEME_ADMIN_KEY). Every caller is admin!");
        } else {
            tracing::warn!("No admin key configured (SCHEME_ADMIN_KEY). Catalog writes are disabled");
        }
    }

    // Initialize database
    let retry = ConnectRetry {
        attempts: config.connect_attempts,
        initial_backoff: config.connect_backoff,
    };
    let pool = db::init_database(&config.db_path, retry).await?;

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    let policy = StorePolicy {
        timeout: config.store_timeout,
        read_retries: config.store_read_retries,
    };
    let catalog = SchemeCatalog::new(SchemeRepository::new(pool), search, policy);

    if let Some(seed_path) = &config.seed_path {
        catalog.seed_if_empty(seed_path).await?;
    }

    // Build initial search index from database
    tracing::info!("Building search index...");
    let indexed = catalog.rebuild_index().await?;
    tracing::info!("Search index built with {} schemes", indexed);

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_window,
        config.rate_limit_max_requests,
    ));
    limiter.spawn_purge();

    // Create application state
    let state = AppState {
        catalog,
        config: Arc::new(config.clone()),
        limiter,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    // API routes
    let api_routes = Router::new()
        // Schemes
        .route("/schemes", get(api::list_schemes).post(api::create_scheme))
        .route("/schemes/filter", get(api::filter_schemes))
        .route("/schemes/search", get(api::search_schemes))
        .route("/schemes/featured", get(api::featured_schemes))
        .route("/schemes/categories", get(api::scheme_categories))
        .route("/schemes/districts", get(api::scheme_districts))
        .route("/schemes/category/{category}", get(api::schemes_by_category))
        .route("/schemes/admin/all", get(api::list_all_schemes))
        .route(
            "/schemes/{id}",
            get(api::get_scheme)
                .put(api::update_scheme)
                .delete(api::delete_scheme),
        )
        // Chatbot
        .route("/chatbot/chat", post(api::chat))
        .route("/chatbot/suggestions", get(api::chat_suggestions))
        .route("/chatbot/categories", get(api::chat_categories))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::enforce,
        ));

    // Health check (not rate limited)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/v2", api_routes)
        .merge(health_routes)
        .fallback(api::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    timestamp: String,
    environment: &'static str,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> api::ApiResult<HealthStatus> {
    api::success(HealthStatus {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
        environment: state.config.environment.as_str(),
    })
}
