//! Fakes shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use venue::app::controller::{Controller, PollingOptions};
use venue::errors::VenueError;
use venue::http::api::{ApiConnector, DeploymentsApi};
use venue::models::deployment::{Deployment, DeploymentState};
use venue::models::project::Project;
use venue::storage::session::MemorySessionStore;
use venue::tray::indicator::TrayIndicator;
use venue::tray::status::TrayStatus;

pub fn deployment(id: &str, state: DeploymentState) -> Deployment {
    Deployment {
        id: id.to_string(),
        display_name: "demo".to_string(),
        state,
        commit_message: Some(format!("commit {}", id)),
        branch: Some("main".to_string()),
        created_at_millis: 1_700_000_000_000,
    }
}

/// Scripted deployments API
#[derive(Default)]
pub struct FakeApi {
    projects: Mutex<Option<Result<Vec<Project>, (u16, String)>>>,
    deployments: Mutex<Option<Result<Vec<Deployment>, (u16, String)>>>,
    deployment_delay: Mutex<Option<Duration>>,
    project_calls: AtomicU32,
    deployment_calls: AtomicU32,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_projects(&self, projects: Vec<Project>) {
        *self.projects.lock().unwrap() = Some(Ok(projects));
    }

    pub fn fail_projects(&self, status: u16, message: &str) {
        *self.projects.lock().unwrap() = Some(Err((status, message.to_string())));
    }

    pub fn set_deployments(&self, deployments: Vec<Deployment>) {
        *self.deployments.lock().unwrap() = Some(Ok(deployments));
    }

    pub fn fail_deployments(&self, status: u16, message: &str) {
        *self.deployments.lock().unwrap() = Some(Err((status, message.to_string())));
    }

    /// Delay every deployment response by `delay`
    pub fn delay_deployments(&self, delay: Duration) {
        *self.deployment_delay.lock().unwrap() = Some(delay);
    }

    pub fn project_calls(&self) -> u32 {
        self.project_calls.load(Ordering::SeqCst)
    }

    pub fn deployment_calls(&self) -> u32 {
        self.deployment_calls.load(Ordering::SeqCst)
    }
}

fn scripted<T: Clone>(
    slot: &Mutex<Option<Result<T, (u16, String)>>>,
    empty: T,
) -> Result<T, VenueError> {
    match slot.lock().unwrap().clone() {
        Some(Ok(value)) => Ok(value),
        Some(Err((status, message))) => Err(VenueError::ApiError { status, message }),
        None => Ok(empty),
    }
}

#[async_trait]
impl DeploymentsApi for FakeApi {
    async fn list_projects(&self) -> Result<Vec<Project>, VenueError> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        scripted(&self.projects, Vec::new())
    }

    async fn list_deployments(
        &self,
        _project_id: &str,
        _limit: u32,
    ) -> Result<Vec<Deployment>, VenueError> {
        self.deployment_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.deployment_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        scripted(&self.deployments, Vec::new())
    }
}

/// Hands out the same fake for every token and records the tokens
pub struct FakeConnector {
    pub api: Arc<FakeApi>,
    tokens: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(api: Arc<FakeApi>) -> Arc<Self> {
        Arc::new(Self {
            api,
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

impl ApiConnector for FakeConnector {
    fn connect(&self, token: &str) -> Arc<dyn DeploymentsApi> {
        self.tokens.lock().unwrap().push(token.to_string());
        self.api.clone()
    }
}

/// Records every tray status it is given
#[derive(Default)]
pub struct RecordingTray {
    statuses: Mutex<Vec<TrayStatus>>,
}

impl RecordingTray {
    pub fn statuses(&self) -> Vec<TrayStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<TrayStatus> {
        self.statuses.lock().unwrap().last().copied()
    }
}

impl TrayIndicator for RecordingTray {
    fn set_status(&self, status: TrayStatus) {
        self.statuses.lock().unwrap().push(status);
    }
}

/// A controller wired to fakes
pub struct Harness {
    pub controller: Controller,
    pub api: Arc<FakeApi>,
    pub connector: Arc<FakeConnector>,
    pub store: Arc<MemorySessionStore>,
    pub tray: Arc<RecordingTray>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemorySessionStore::new())
    }

    pub fn with_store(store: MemorySessionStore) -> Self {
        let api = FakeApi::new();
        let connector = FakeConnector::new(api.clone());
        let store = Arc::new(store);
        let tray = Arc::new(RecordingTray::default());

        let controller = Controller::new(
            connector.clone(),
            store.clone(),
            tray.clone(),
            PollingOptions::default(),
        );

        Self {
            controller,
            api,
            connector,
            store,
            tray,
        }
    }
}
