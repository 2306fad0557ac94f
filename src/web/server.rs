//! Web server implementation using axum

use anyhow::{Context, Result};
use axum::http::{HeaderName, Method};
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Settings;

use super::api::{self, SharedContext};

/// Dashboard web server
pub struct WebServer {
    settings: Settings,
    context: SharedContext,
}

impl WebServer {
    /// Create a new web server
    pub fn new(settings: Settings, context: SharedContext) -> Self {
        Self { settings, context }
    }

    /// Run the web server until it fails
    pub async fn run(self) -> Result<()> {
        let host = self.settings.web.host.clone();
        let port = self.settings.web.port;

        let app = router(self.context);

        tracing::info!("Starting cc-wait dashboard + daemon on http://{}:{}", host, port);

        let listener = tokio::net::TcpListener::bind((host.as_str(), port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", host, port))?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// All dashboard routes over one shared context
pub(crate) fn router(context: SharedContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([HeaderName::from_static("content-type")]);

    let api_routes = Router::new()
        .route("/usage", get(api::get_usage))
        .route("/sessions", get(api::get_sessions))
        .route("/daemon", get(api::get_daemon));

    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health))
        .nest("/api", api_routes)
        .with_state(context)
        .layer(cors)
}
