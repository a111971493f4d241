//! Remote API adapter bound to a single access token

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::errors::VenueError;
use crate::http::client::HttpClient;
use crate::models::deployment::{has_active_deployment, Deployment};
use crate::models::project::Project;

/// Page where users create access tokens
pub const TOKEN_URL: &str = "https://vercel.com/account/tokens";

/// Deployments API, trait for testability
#[async_trait]
pub trait DeploymentsApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, VenueError>;

    /// Most recent deployments of a project, newest first
    async fn list_deployments(
        &self,
        project_id: &str,
        limit: u32,
    ) -> Result<Vec<Deployment>, VenueError>;

    fn has_active_deployment(&self, deployments: &[Deployment]) -> bool {
        has_active_deployment(deployments)
    }
}

/// Builds an API adapter bound to an access token
pub trait ApiConnector: Send + Sync {
    fn connect(&self, token: &str) -> Arc<dyn DeploymentsApi>;
}

/// Vercel REST adapter
pub struct VercelClient {
    http: HttpClient,
    token: SecretString,
    project_limit: u32,
}

impl VercelClient {
    pub fn new(http: HttpClient, token: SecretString, project_limit: u32) -> Self {
        Self {
            http,
            token,
            project_limit,
        }
    }
}

impl std::fmt::Debug for VercelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VercelClient")
            .field("base_url", &self.http.base_url())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl DeploymentsApi for VercelClient {
    async fn list_projects(&self) -> Result<Vec<Project>, VenueError> {
        self.http
            .list_projects(self.token.expose_secret(), self.project_limit)
            .await
    }

    async fn list_deployments(
        &self,
        project_id: &str,
        limit: u32,
    ) -> Result<Vec<Deployment>, VenueError> {
        self.http
            .list_deployments(self.token.expose_secret(), project_id, limit)
            .await
    }
}

/// Connector producing `VercelClient`s that share one HTTP connection pool
#[derive(Debug, Clone)]
pub struct VercelConnector {
    http: HttpClient,
    project_limit: u32,
}

impl VercelConnector {
    pub fn new(http: HttpClient, project_limit: u32) -> Self {
        Self { http, project_limit }
    }
}

impl ApiConnector for VercelConnector {
    fn connect(&self, token: &str) -> Arc<dyn DeploymentsApi> {
        Arc::new(VercelClient::new(
            self.http.clone(),
            SecretString::from(token.to_string()),
            self.project_limit,
        ))
    }
}

/// Dashboard link for a deployment: `<dashboard>/<project>/<deployment>`
pub fn deployment_url(
    dashboard_url: &str,
    project_name: &str,
    deployment_id: &str,
) -> Result<Url, VenueError> {
    let mut url = Url::parse(dashboard_url)
        .map_err(|e| VenueError::ConfigError(format!("Invalid dashboard URL: {}", e)))?;

    url.path_segments_mut()
        .map_err(|_| VenueError::ConfigError("Dashboard URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push(project_name)
        .push(deployment_id);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_url() {
        let url = deployment_url("https://vercel.com", "demo", "dpl_123").unwrap();
        assert_eq!(url.as_str(), "https://vercel.com/demo/dpl_123");

        let url = deployment_url("https://vercel.com/", "demo", "dpl_123").unwrap();
        assert_eq!(url.as_str(), "https://vercel.com/demo/dpl_123");
    }

    #[test]
    fn test_deployment_url_rejects_bad_host() {
        assert!(deployment_url("not a url", "demo", "dpl").is_err());
    }

    #[test]
    fn test_client_debug_redacts_token() {
        let http = HttpClient::new("https://api.vercel.com", std::time::Duration::from_secs(5))
            .unwrap();
        let client = VercelClient::new(http, SecretString::from("s3cret".to_string()), 100);
        let printed = format!("{:?}", client);
        assert!(!printed.contains("s3cret"));
    }
}
