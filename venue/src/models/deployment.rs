//! Deployment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deployment state as reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeploymentState {
    Building,
    Queued,
    Initializing,
    /// Assumed when the provider omits the state
    #[default]
    Ready,
    Error,
    Canceled,
    /// A state this build does not know about. Neither active nor terminal.
    Unknown(String),
}

impl DeploymentState {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "BUILDING" => DeploymentState::Building,
            "QUEUED" => DeploymentState::Queued,
            "INITIALIZING" => DeploymentState::Initializing,
            "READY" => DeploymentState::Ready,
            "ERROR" => DeploymentState::Error,
            "CANCELED" => DeploymentState::Canceled,
            other => DeploymentState::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeploymentState::Building => "BUILDING",
            DeploymentState::Queued => "QUEUED",
            DeploymentState::Initializing => "INITIALIZING",
            DeploymentState::Ready => "READY",
            DeploymentState::Error => "ERROR",
            DeploymentState::Canceled => "CANCELED",
            DeploymentState::Unknown(raw) => raw,
        }
    }

    /// Build or deploy still in progress
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DeploymentState::Building | DeploymentState::Queued | DeploymentState::Initializing
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentState::Ready | DeploymentState::Error | DeploymentState::Canceled
        )
    }
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeploymentState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeploymentState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(DeploymentState::from_wire(&s))
    }
}

/// Snapshot of a single deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub display_name: String,
    pub state: DeploymentState,
    pub commit_message: Option<String>,
    pub branch: Option<String>,
    /// Creation time, Unix epoch milliseconds
    pub created_at_millis: i64,
}

impl Deployment {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at_millis)
    }
}

/// True iff any deployment is still building, queued or initializing
pub fn has_active_deployment(deployments: &[Deployment]) -> bool {
    deployments.iter().any(|d| d.state.is_active())
}
