//! Tray status derivation

use serde::Serialize;

use crate::models::deployment::{Deployment, DeploymentState};

/// Status tag shown by the tray indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrayStatus {
    /// Idle, unauthenticated, or nothing to show
    Gray,
    Ready,
    Building,
    Error,
}

impl TrayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrayStatus::Gray => "gray",
            TrayStatus::Ready => "ready",
            TrayStatus::Building => "building",
            TrayStatus::Error => "error",
        }
    }

    /// Status of the most recent deployment. The list is newest first.
    pub fn from_latest(deployments: &[Deployment]) -> Self {
        let Some(latest) = deployments.first() else {
            return TrayStatus::Gray;
        };

        match latest.state {
            DeploymentState::Ready => TrayStatus::Ready,
            DeploymentState::Error | DeploymentState::Canceled => TrayStatus::Error,
            DeploymentState::Building
            | DeploymentState::Queued
            | DeploymentState::Initializing => TrayStatus::Building,
            DeploymentState::Unknown(_) => TrayStatus::Gray,
        }
    }
}

impl std::fmt::Display for TrayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
