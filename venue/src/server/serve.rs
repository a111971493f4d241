//! Local control server
//!
//! Stands in for the tray window's buttons: every route maps to one user
//! intent on the controller.

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::VenueError;
use crate::server::handlers::{
    change_project_handler, deployment_url_handler, health_handler, load_projects_handler,
    login_handler, logout_handler, projects_handler, refresh_handler, select_project_handler,
    state_handler, token_link_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // State
        .route("/state", get(state_handler))
        .route("/links/token", get(token_link_handler))
        // Session
        .route("/session", post(login_handler).delete(logout_handler))
        // Projects
        .route("/projects", get(projects_handler))
        .route("/projects/refresh", post(load_projects_handler))
        .route("/project", post(select_project_handler).delete(change_project_handler))
        // Deployments
        .route("/refresh", post(refresh_handler))
        .route("/deployments/{id}/url", get(deployment_url_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), VenueError>>, VenueError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting control server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| VenueError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| VenueError::ServerError(e.to_string()))
    });

    Ok(handle)
}
