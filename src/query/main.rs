//! Query server for nearest-court searches.
//!
//! Loads every configured dataset at startup, builds one spatial index per
//! sport, and serves nearest, lookup, geocoding and reload endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use courtside::config::Config;
use courtside::geocode::Geocoder;
use courtside::store::load_all;
use courtside::{DatasetRegistry, QueryEngine};

mod routes;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Nearest court query server")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "courtside.toml")]
    config: PathBuf,

    /// Listen address (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,
}

/// Application state shared across handlers
pub struct AppState {
    pub engine: QueryEngine,
    pub geocoder: Geocoder,
    pub config: Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load_from_file(&args.config)?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    info!("{}", config.server.app_name);

    if config.datasets.is_empty() {
        warn!("No datasets configured; every query will return an unknown dataset error");
    }

    let datasets = load_all(&config.dataset_sources()).context("Failed to load datasets")?;
    let registry = Arc::new(DatasetRegistry::from_datasets(datasets));
    let engine = QueryEngine::new(registry);
    let geocoder = Geocoder::new(&config.geocoder)?;

    let listen = config.server.listen.clone();
    let cors = cors_layer(&config.server.allowed_origins);

    let state = Arc::new(AppState {
        engine,
        geocoder,
        config,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(routes::health_handler))
        .route("/v1/nearest", get(routes::nearest_handler))
        .route("/v1/courts/{sport}/{court_id}", get(routes::court_handler))
        .route("/v1/geocode", get(routes::geocode_handler))
        .route("/v1/reverse", get(routes::reverse_handler))
        .route("/admin/reload", post(routes::reload_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
