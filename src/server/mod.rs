use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
};

use crate::config::ServerConfig;
use crate::storage::{self, PatternStore};

use handlers::{
    analyze_handler, get_pattern_handler, health_check, list_patterns_handler,
    list_scopes_handler,
};

pub mod handlers;
mod models;

/// Query batches can be large; cap request bodies at 64 MiB.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PatternStore>,
    pub config: ServerConfig,
}

pub async fn run() {
    dotenv().ok();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    run_with_config(config).await;
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_handler))
        .route("/patterns", get(list_patterns_handler))
        .route("/patterns/{scope}/{table}", get(get_pattern_handler))
        .route("/scopes", get(list_scopes_handler))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

pub async fn run_with_config(config: ServerConfig) {
    dotenv().ok();

    log::info!(
        "Server configuration: http={}:{}, store={}, bucket={}, min_hits={}, window_days={}",
        config.http_host,
        config.http_port,
        config.store_path.as_deref().unwrap_or("<memory>"),
        config.bucket_granularity,
        config.min_hit_threshold,
        config.window_days
    );

    let store = match storage::open_store(config.store_path.as_deref()) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to open pattern store: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = Arc::new(AppState {
        store,
        config: config.clone(),
    });

    let http_bind_address = format!("{}:{}", config.http_host, config.http_port);
    log::info!("Starting HTTP server on {}", http_bind_address);

    let app = build_router(app_state);

    let http_listener = match TcpListener::bind(&http_bind_address).await {
        Ok(listener) => {
            log::info!("Successfully bound HTTP listener to {}", http_bind_address);
            listener
        }
        Err(e) => {
            log::error!(
                "Failed to bind HTTP listener to {}: {}",
                http_bind_address,
                e
            );
            log::error!("  Is another process using port {}?", config.http_port);
            std::process::exit(1);
        }
    };

    let http_server = axum::serve(http_listener, app);

    println!("QueryPatterns server is running");
    println!("  HTTP API: http://{}", http_bind_address);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                log::error!(
                    "Failed to register SIGTERM handler: {}. Running without graceful shutdown.",
                    e
                );
                if let Err(e) = http_server.await {
                    log::error!("HTTP server error: {:?}", e);
                }
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                log::error!(
                    "Failed to register SIGINT handler: {}. Running without graceful shutdown.",
                    e
                );
                if let Err(e) = http_server.await {
                    log::error!("HTTP server error: {:?}", e);
                }
                return;
            }
        };

        tokio::select! {
            result = http_server => {
                if let Err(e) = result {
                    log::error!("HTTP server error: {:?}", e);
                }
            }
            _ = sigterm.recv() => println!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => println!("Received SIGINT, shutting down..."),
        }
    }

    #[cfg(windows)]
    {
        tokio::select! {
            result = http_server => {
                if let Err(e) = result {
                    log::error!("HTTP server error: {:?}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Received shutdown signal, shutting down...");
            }
        }
    }

    println!("Server stopped");
}
