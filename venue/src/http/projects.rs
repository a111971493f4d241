//! Projects API

use serde::Deserialize;

use crate::errors::VenueError;
use crate::http::client::HttpClient;
use crate::models::project::Project;

#[derive(Debug, Clone, Deserialize)]
struct ProjectListResponse {
    projects: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectSummary {
    id: String,
    name: String,
}

impl HttpClient {
    /// List the projects visible to the token
    pub async fn list_projects(&self, token: &str, limit: u32) -> Result<Vec<Project>, VenueError> {
        let response: ProjectListResponse = self
            .get("/v9/projects", &[("limit", limit.to_string())], token)
            .await?;

        Ok(response
            .projects
            .into_iter()
            .map(|p| Project::new(p.id, p.name))
            .collect())
    }
}
