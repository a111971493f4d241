//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app::state::AppState;
use crate::errors::VenueError;
use crate::http::api::{deployment_url, TOKEN_URL};
use crate::models::deployment::Deployment;
use crate::models::project::{filter_projects, Project};
use crate::server::state::ServerState;
use crate::tray::status::TrayStatus;
use crate::utils::{version_info, VersionInfo};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "venue".to_string(),
        version: version.version,
    })
}

/// Build metadata plus the API this instance polls
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    #[serde(flatten)]
    pub build: VersionInfo,
    pub api_base_url: String,
}

/// Version handler
pub async fn version_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(VersionResponse {
        build: version_info(),
        api_base_url: state.api_base_url.clone(),
    })
}

/// Application state as seen by clients. The access token never leaves the
/// process.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub authenticated: bool,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub projects: Vec<Project>,
    pub deployments: Vec<Deployment>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub tray_status: TrayStatus,
    pub polling: bool,
    pub poll_interval_ms: Option<u64>,
}

fn state_response(state: &ServerState) -> StateResponse {
    let AppState {
        session,
        projects,
        deployments,
        is_loading,
        error,
    } = state.controller.snapshot();
    let poller = state.controller.poller_status();

    let tray_status = TrayStatus::from_latest(&deployments);

    StateResponse {
        authenticated: session.is_authenticated(),
        project_id: session.project_id,
        project_name: session.project_name,
        projects,
        deployments,
        is_loading,
        error,
        tray_status,
        polling: poller.running,
        poll_interval_ms: poller.interval.map(|i| i.as_millis() as u64),
    }
}

/// Current state handler
pub async fn state_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(state_response(&state))
}

/// Link response
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub url: String,
}

/// Where to create an access token
pub async fn token_link_handler() -> impl IntoResponse {
    Json(LinkResponse {
        url: TOKEN_URL.to_string(),
    })
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

/// Login handler
pub async fn login_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    state.controller.set_access_token(token).await;
    Ok(Json(state_response(&state)))
}

/// Logout handler
pub async fn logout_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    state.controller.logout().await;
    Json(state_response(&state))
}

/// Reload the project list
pub async fn load_projects_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    state.controller.load_projects().await;
    Json(state_response(&state))
}

/// Project selection request
#[derive(Debug, Deserialize)]
pub struct SelectProjectRequest {
    pub id: String,
    pub name: String,
}

/// Project search query
#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    #[serde(default)]
    pub q: String,
}

/// Project list response
#[derive(Debug, Serialize)]
pub struct ProjectsResponse {
    pub projects: Vec<Project>,
}

/// Loaded projects whose name matches `q`, ignoring case
pub async fn projects_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ProjectQuery>,
) -> impl IntoResponse {
    let projects = state.controller.snapshot().projects;
    Json(ProjectsResponse {
        projects: filter_projects(&projects, &query.q),
    })
}

/// Select project handler
pub async fn select_project_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<SelectProjectRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    match state
        .controller
        .select_project(&request.id, &request.name)
        .await
    {
        Ok(()) => Ok(Json(state_response(&state))),
        Err(VenueError::NotAuthenticated(msg)) => {
            warn!("Rejected project selection: {}", msg);
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            warn!("Project selection failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Change project handler
pub async fn change_project_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    state.controller.change_project().await;
    Json(state_response(&state))
}

/// Refresh deployments handler
pub async fn refresh_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    state.controller.refresh().await;
    Json(state_response(&state))
}

/// Dashboard link for a deployment of the selected project
pub async fn deployment_url_handler(
    State(state): State<Arc<ServerState>>,
    Path(deployment_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let project_name = state
        .controller
        .snapshot()
        .session
        .project_name
        .ok_or(StatusCode::CONFLICT)?;

    let url = deployment_url(&state.dashboard_url, &project_name, &deployment_id).map_err(|e| {
        warn!("Failed to build deployment URL: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(LinkResponse {
        url: url.to_string(),
    }))
}
