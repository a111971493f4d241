//! Project model

use serde::{Deserialize, Serialize};

/// A project the access token can see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Projects whose name contains `query`, ignoring case. A blank query keeps
/// every project.
pub fn filter_projects(projects: &[Project], query: &str) -> Vec<Project> {
    let query = query.trim().to_lowercase();
    projects
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&query))
        .cloned()
        .collect()
}
