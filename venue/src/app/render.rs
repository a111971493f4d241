//! Terminal rendering of the application state

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use colored::{ColoredString, Colorize};

use crate::app::state::AppState;
use crate::http::api::{deployment_url, TOKEN_URL};
use crate::models::deployment::{Deployment, DeploymentState};
use crate::models::project::Project;

/// Which screen the state calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Loading,
    Auth,
    ProjectSelect,
    Deployments,
}

impl View {
    pub fn for_state(state: &AppState) -> Self {
        if state.is_loading {
            View::Loading
        } else if !state.session.is_authenticated() {
            View::Auth
        } else if state.session.project_id.is_none() {
            View::ProjectSelect
        } else {
            View::Deployments
        }
    }
}

/// Render the state as plain terminal text
pub fn render(state: &AppState, dashboard_url: &str, now: DateTime<Utc>) -> String {
    match View::for_state(state) {
        View::Loading => "Loading...".dimmed().to_string(),
        View::Auth => format!(
            "{}\nCreate an access token at {} and log in with POST /session",
            "Not logged in".bold(),
            TOKEN_URL
        ),
        View::ProjectSelect => render_projects(&state.projects, state.error.as_deref()),
        View::Deployments => {
            let project_name = state.session.project_name.as_deref().unwrap_or_default();
            render_deployments(&state.deployments, project_name, dashboard_url, now)
        }
    }
}

fn render_projects(projects: &[Project], error: Option<&str>) -> String {
    if let Some(error) = error {
        return error.red().to_string();
    }
    if projects.is_empty() {
        return "No projects found. Check your token permissions.".to_string();
    }

    let mut out = format!("{}", "Select a project:".bold());
    for project in projects {
        out.push_str(&format!("\n  {} {}", project.name, project.id.dimmed()));
    }
    out
}

fn render_deployments(
    deployments: &[Deployment],
    project_name: &str,
    dashboard_url: &str,
    now: DateTime<Utc>,
) -> String {
    let mut out = format!("{}", project_name.bold());
    if deployments.is_empty() {
        out.push_str("\n  No deployments yet");
        return out;
    }

    for d in deployments {
        let title = d.commit_message.as_deref().unwrap_or(&d.display_name);
        let branch = d.branch.as_deref().unwrap_or("main");
        let time = d
            .created_at()
            .map(|created| relative_time(created, now))
            .unwrap_or_default();
        let url = deployment_url(dashboard_url, project_name, &d.id)
            .map(|u| u.to_string())
            .unwrap_or_default();

        out.push_str(&format!(
            "\n  {} {}\n    {} · {} · {}\n    {}",
            status_marker(&d.state),
            title,
            status_text(&d.state),
            time,
            branch,
            url.dimmed()
        ));
    }
    out
}

fn status_marker(state: &DeploymentState) -> ColoredString {
    match state {
        DeploymentState::Ready => "▲".green(),
        DeploymentState::Error | DeploymentState::Canceled => "▲".red(),
        DeploymentState::Building | DeploymentState::Queued | DeploymentState::Initializing => {
            "▲".yellow()
        }
        DeploymentState::Unknown(_) => "▲".dimmed(),
    }
}

pub fn status_text(state: &DeploymentState) -> &'static str {
    match state {
        DeploymentState::Ready => "Ready",
        DeploymentState::Building => "Building",
        DeploymentState::Queued => "Queued",
        DeploymentState::Initializing => "Initializing",
        DeploymentState::Error => "Error",
        DeploymentState::Canceled => "Canceled",
        DeploymentState::Unknown(_) => "Unknown",
    }
}

/// "just now", "5m ago", "3h ago", then "today", "yesterday" or a short date
pub fn relative_time(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    relative_time_in(&Local, created, now)
}

fn relative_time_in<Tz: TimeZone>(tz: &Tz, created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - created;
    if diff < Duration::minutes(1) {
        return "just now".to_string();
    }
    if diff < Duration::hours(1) {
        return format!("{}m ago", diff.num_minutes());
    }
    if diff < Duration::hours(12) {
        return format!("{}h ago", diff.num_hours());
    }

    let created_day = created.with_timezone(tz).date_naive();
    let today = now.with_timezone(tz).date_naive();
    if created_day == today {
        "today".to_string()
    } else if Some(created_day) == today.pred_opt() {
        "yesterday".to_string()
    } else {
        created_day.format("%b %-d").to_string()
    }
}

/// Prints the rendered state whenever it changes
pub struct StatePrinter {
    dashboard_url: String,
    last: Mutex<Option<String>>,
}

impl StatePrinter {
    pub fn new(dashboard_url: impl Into<String>) -> Self {
        Self {
            dashboard_url: dashboard_url.into(),
            last: Mutex::new(None),
        }
    }

    pub fn print(&self, state: &AppState) {
        let rendered = render(state, &self.dashboard_url, Utc::now());
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.as_deref() != Some(rendered.as_str()) {
            println!("{}\n", rendered);
            *last = Some(rendered);
        }
    }
}
