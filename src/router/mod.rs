//! Routing module for the HTTP transport

use crate::mcp::models::MCP_SESSION_HEADER;
use crate::session::SharedState;
use axum::{body::Body, extract::Request, http::HeaderName, middleware::Next, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Creates and configures the application router with all routes and middleware
pub fn create_app_router(state: SharedState) -> Router {
    // Middleware: Log requests
    let log_layer = axum::middleware::from_fn(|req: Request<Body>, next: Next| async move {
        let method = req.method().clone();
        // Path only: initialize carries credentials in the query string
        let uri = req.uri().path().to_string();
        info!(%method, %uri, "REQ");
        let res = next.run(req).await;
        if !res.status().is_success() {
            warn!(%method, %uri, status = %res.status(), "RES (Error)");
        }
        res
    });

    // Middleware: CORS (clients must be able to read the session header)
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(MCP_SESSION_HEADER)]);

    Router::new()
        .merge(crate::mcp::routes())
        .layer(log_layer)
        .layer(cors_layer)
        .with_state(state)
}
