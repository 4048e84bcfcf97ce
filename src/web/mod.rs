//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::inventory::InventoryService;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub service: Arc<InventoryService>,
}

/// Web server for fleetwatch.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, service: Arc<InventoryService>) -> Self {
        Self {
            state: AppState { config, service },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Dashboard
            .route("/", get(handlers::handle_dashboard))
            // API endpoints
            .route("/api/servers", get(handlers::handle_list_servers))
            .route("/api/servers", post(handlers::handle_create_server))
            .route("/api/servers/bulk", post(handlers::handle_create_servers_bulk))
            .route("/api/servers/{id}", get(handlers::handle_get_server))
            .route("/api/servers/{id}", put(handlers::handle_update_server))
            .route("/api/servers/{id}", delete(handlers::handle_delete_server))
            .route("/api/servers/{id}/uptime", get(handlers::handle_server_uptime))
            .route("/api/status", get(handlers::handle_status))
            // Static assets
            .route("/favicon.ico", get(handlers::handle_favicon))
            .layer(cors)
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
