mod handlers;
mod state;

use axum::Router;
use axum::routing::get;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::geocode::NominatimGateway;
use crate::geolocate::IpApiSource;

pub fn build_router(map_key: Option<String>) -> Router {
    let state = Arc::new(AppState {
        gateway: NominatimGateway::new(),
        positioner: IpApiSource::new(),
        map_key,
    });

    Router::new()
        .route("/api/config", get(handlers::config))
        .route("/api/reverse", get(handlers::reverse))
        .route("/api/locate", get(handlers::locate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, map_key: Option<String>) {
    let app = build_router(map_key);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: Cannot bind to {}: {}", addr, e);
            std::process::exit(1);
        });

    eprintln!("  Mawqii server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Server error: {}", e);
            std::process::exit(1);
        });
}
