//! Deployments API

use serde::Deserialize;

use crate::errors::VenueError;
use crate::http::client::HttpClient;
use crate::models::deployment::{Deployment, DeploymentState};

#[derive(Debug, Clone, Deserialize)]
struct DeploymentListResponse {
    deployments: Vec<DeploymentSummary>,
}

#[derive(Debug, Clone, Deserialize)]
struct DeploymentSummary {
    uid: String,
    name: String,
    #[serde(default)]
    state: Option<DeploymentState>,
    #[serde(default)]
    meta: Option<DeploymentMeta>,
    created: i64,
}

/// Source-control metadata attached to a deployment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentMeta {
    github_commit_message: Option<String>,
    gitlab_commit_message: Option<String>,
    github_commit_ref: Option<String>,
    gitlab_commit_ref: Option<String>,
}

impl From<DeploymentSummary> for Deployment {
    fn from(summary: DeploymentSummary) -> Self {
        let meta = summary.meta.unwrap_or_default();
        Deployment {
            id: summary.uid,
            display_name: summary.name,
            state: summary.state.unwrap_or_default(),
            // GitHub wins when both providers are present
            commit_message: meta.github_commit_message.or(meta.gitlab_commit_message),
            branch: meta.github_commit_ref.or(meta.gitlab_commit_ref),
            created_at_millis: summary.created,
        }
    }
}

impl HttpClient {
    /// List the most recent deployments of a project, newest first
    pub async fn list_deployments(
        &self,
        token: &str,
        project_id: &str,
        limit: u32,
    ) -> Result<Vec<Deployment>, VenueError> {
        let response: DeploymentListResponse = self
            .get(
                "/v6/deployments",
                &[
                    ("projectId", project_id.to_string()),
                    ("limit", limit.to_string()),
                ],
                token,
            )
            .await?;

        Ok(response.deployments.into_iter().map(Deployment::from).collect())
    }
}
