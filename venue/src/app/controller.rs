//! Application state controller
//!
//! The only writer of [`AppState`]. It sequences the login, project selection
//! and logout flows and runs the adaptive deployment poll:
//!
//! * on start the deployments are fetched immediately and a repeating timer
//!   is scheduled, fast while a deployment is active and slow otherwise;
//! * after every fetch the timer is rescheduled only if the activity flag
//!   flipped between the previous and the new snapshot;
//! * a failed fetch clears the loading flag and changes nothing else.
//!
//! Every fetch records the session generation it started under. Changing
//! the token, the project, or logging out bumps the generation, and
//! responses from an older generation are dropped. The generation is checked
//! again under the state, tray and timer locks, and stopping the timer bumps
//! it under the timer lock, so a stale fetch can neither write state nor
//! restart a stopped timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::app::state::{AppState, Session, StateStore, Subscription};
use crate::errors::VenueError;
use crate::http::api::{ApiConnector, DeploymentsApi};
use crate::models::deployment::has_active_deployment;
use crate::storage::session::{SessionKey, SessionStore};
use crate::tray::indicator::TrayIndicator;
use crate::tray::status::TrayStatus;
use crate::workers::poller::{PollTimer, PollerStatus};

/// Polling cadence and page size
#[derive(Debug, Clone)]
pub struct PollingOptions {
    /// Interval while a deployment is active
    pub fast_interval: Duration,

    /// Interval while all deployments are settled
    pub slow_interval: Duration,

    /// Deployments fetched per poll
    pub deployment_limit: u32,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            fast_interval: Duration::from_secs(5),
            slow_interval: Duration::from_secs(30),
            deployment_limit: 10,
        }
    }
}

struct Inner {
    connector: Arc<dyn ApiConnector>,
    session_store: Arc<dyn SessionStore>,
    tray: Arc<dyn TrayIndicator>,
    // orders tray updates against generation bumps
    tray_lock: Mutex<()>,
    options: PollingOptions,
    store: Arc<StateStore>,
    api: Mutex<Option<Arc<dyn DeploymentsApi>>>,
    timer: Mutex<PollTimer>,
    generation: AtomicU64,
}

/// Cheap-to-clone handle to the application controller
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    pub fn new(
        connector: Arc<dyn ApiConnector>,
        session_store: Arc<dyn SessionStore>,
        tray: Arc<dyn TrayIndicator>,
        options: PollingOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                session_store,
                tray,
                tray_lock: Mutex::new(()),
                options,
                store: StateStore::new(),
                api: Mutex::new(None),
                timer: Mutex::new(PollTimer::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    // ================================ STATE ==================================== //

    pub fn snapshot(&self) -> AppState {
        self.inner.store.snapshot()
    }

    /// See [`StateStore::subscribe`]
    pub fn subscribe(&self, listener: impl Fn(&AppState) + Send + Sync + 'static) -> Subscription {
        self.inner.store.subscribe(listener)
    }

    pub fn poller_status(&self) -> PollerStatus {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .status()
    }

    // =============================== OPERATIONS ================================= //

    /// Restore the persisted session and resume where the user left off
    pub async fn initialize(&self) {
        info!("Initializing session...");

        let Some(access_token) = self.load_key(SessionKey::AccessToken).await else {
            info!("No access token stored, waiting for login");
            self.set_tray(TrayStatus::Gray);
            return;
        };
        let project_id = self.load_key(SessionKey::ProjectId).await;
        let project_name = self.load_key(SessionKey::ProjectName).await;

        self.connect(&access_token);
        let has_project = project_id.is_some();
        self.inner.store.update(|s| {
            s.session = Session {
                access_token: Some(access_token),
                project_id,
                project_name,
            };
        });

        if has_project {
            self.start_polling(self.generation()).await;
        } else {
            self.load_projects().await;
        }
    }

    /// Log in with a new access token and load the project list
    pub async fn set_access_token(&self, token: &str) {
        info!("Setting access token");
        self.bump_generation();
        self.connect(token);

        self.persist(SessionKey::AccessToken, token).await;
        self.inner
            .store
            .update(|s| s.session.access_token = Some(token.to_string()));

        self.load_projects().await;
    }

    /// Select the project to track and start polling its deployments
    pub async fn select_project(
        &self,
        project_id: &str,
        project_name: &str,
    ) -> Result<(), VenueError> {
        if self.api().is_none() {
            return Err(VenueError::NotAuthenticated(
                "log in before selecting a project".to_string(),
            ));
        }

        info!("Selecting project {} ({})", project_name, project_id);
        let generation = self.bump_generation();

        self.persist(SessionKey::ProjectId, project_id).await;
        self.persist(SessionKey::ProjectName, project_name).await;
        self.inner.store.update(|s| {
            s.session.project_id = Some(project_id.to_string());
            s.session.project_name = Some(project_name.to_string());
            s.is_loading = true;
        });

        self.start_polling(generation).await;
        Ok(())
    }

    /// Fetch the project list. Does nothing when logged out.
    pub async fn load_projects(&self) {
        let Some(api) = self.api() else {
            debug!("Not authenticated, skipping project load");
            return;
        };
        let generation = self.generation();

        self.inner.store.update(|s| s.is_loading = true);
        let result = api.list_projects().await;

        if generation != self.generation() {
            debug!("Discarding project list from a previous session");
            return;
        }

        match result {
            Ok(projects) => {
                info!("Loaded {} projects", projects.len());
                self.inner.store.update(|s| {
                    if self.is_current(generation) {
                        s.projects = projects;
                        s.is_loading = false;
                        s.error = None;
                    }
                });
            }
            Err(e) => {
                error!("Failed to load projects: {}", e);
                self.inner.store.update(|s| {
                    if self.is_current(generation) {
                        s.is_loading = false;
                        s.error = Some(e.to_string());
                    }
                });
            }
        }
    }

    /// Fetch deployments now, outside the timer cadence
    pub async fn refresh(&self) {
        self.fetch_deployments().await;
    }

    /// Forget the selected project and go back to the project list
    pub async fn change_project(&self) {
        info!("Changing project");
        self.stop_polling();

        self.forget(SessionKey::ProjectId).await;
        self.forget(SessionKey::ProjectName).await;
        self.inner.store.update(|s| {
            s.session.project_id = None;
            s.session.project_name = None;
            s.deployments.clear();
        });
        self.set_tray(TrayStatus::Gray);

        self.load_projects().await;
    }

    /// Drop the token and everything derived from it
    pub async fn logout(&self) {
        info!("Logging out");
        self.stop_polling();
        *self.inner.api.lock().unwrap_or_else(|e| e.into_inner()) = None;

        self.forget(SessionKey::AccessToken).await;
        self.forget(SessionKey::ProjectId).await;
        self.forget(SessionKey::ProjectName).await;
        self.inner.store.update(|s| {
            s.session = Session::default();
            s.deployments.clear();
            s.projects.clear();
            s.is_loading = false;
            s.error = None;
        });
        self.set_tray(TrayStatus::Gray);
    }

    /// Stop the poll timer for process exit
    pub fn shutdown(&self) {
        info!("Shutting down controller...");
        self.stop_polling();
    }

    // ================================ POLLING ================================== //

    async fn start_polling(&self, generation: u64) {
        let has_active = has_active_deployment(&self.snapshot().deployments);
        self.schedule_polling(has_active, generation);
        self.fetch_deployments().await;
    }

    /// Stop the timer and invalidate every fetch in flight
    fn stop_polling(&self) {
        let mut timer = self.inner.timer.lock().unwrap_or_else(|e| e.into_inner());
        timer.stop();
        self.bump_generation();
    }

    /// (Re)start the timer unless the session moved past `generation`
    fn schedule_polling(&self, has_active: bool, generation: u64) {
        let interval = if has_active {
            self.inner.options.fast_interval
        } else {
            self.inner.options.slow_interval
        };

        let mut timer = self.inner.timer.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_current(generation) {
            debug!("Session changed, not rescheduling poll");
            return;
        }

        // the timer only holds a weak reference so dropping the controller
        // stops it
        let weak = Arc::downgrade(&self.inner);
        timer.schedule(interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    Controller { inner }.fetch_deployments().await;
                }
            }
        });
    }

    async fn fetch_deployments(&self) {
        // captured before the project so a change in between is caught
        let generation = self.generation();
        let Some(api) = self.api() else {
            return;
        };
        let Some(project_id) = self.snapshot().session.project_id else {
            return;
        };

        debug!("Fetching deployments for {}", project_id);
        let result = api
            .list_deployments(&project_id, self.inner.options.deployment_limit)
            .await;

        let deployments = match result {
            Ok(deployments) => deployments,
            Err(e) => {
                warn!("Failed to fetch deployments: {}", e);
                self.inner.store.update(|s| {
                    if self.is_current(generation) {
                        s.is_loading = false;
                    }
                });
                return;
            }
        };

        let has_active = api.has_active_deployment(&deployments);
        let status = TrayStatus::from_latest(&deployments);
        debug!(
            "Fetched {} deployments (active: {}, latest: {})",
            deployments.len(),
            has_active,
            status
        );

        let had_active = self.inner.store.update(|s| {
            if !self.is_current(generation) {
                return None;
            }
            let had_active = has_active_deployment(&s.deployments);
            s.deployments = deployments;
            s.is_loading = false;
            Some(had_active)
        });
        let Some(had_active) = had_active else {
            debug!("Discarding deployments for {} from a previous session", project_id);
            return;
        };
        if !self.set_tray_if_current(status, generation) {
            return;
        }

        if had_active != has_active {
            info!(
                "Deployment activity changed ({} -> {}), rescheduling poll",
                had_active, has_active
            );
            self.schedule_polling(has_active, generation);
        }
    }

    // ================================ HELPERS ================================== //

    fn api(&self) -> Option<Arc<dyn DeploymentsApi>> {
        self.inner
            .api
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn connect(&self, token: &str) {
        let api = self.inner.connector.connect(token);
        *self.inner.api.lock().unwrap_or_else(|e| e.into_inner()) = Some(api);
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Returns the new generation
    fn bump_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn set_tray(&self, status: TrayStatus) {
        let _tray = self.inner.tray_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.inner.tray.set_status(status);
    }

    fn set_tray_if_current(&self, status: TrayStatus, generation: u64) -> bool {
        let _tray = self.inner.tray_lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_current(generation) {
            return false;
        }
        self.inner.tray.set_status(status);
        true
    }

    async fn load_key(&self, key: SessionKey) -> Option<String> {
        match self.inner.session_store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to read {} from session store: {}", key.as_str(), e);
                None
            }
        }
    }

    async fn persist(&self, key: SessionKey, value: &str) {
        if let Err(e) = self.inner.session_store.set(key, value).await {
            error!("Failed to persist {}: {}", key.as_str(), e);
        }
    }

    async fn forget(&self, key: SessionKey) {
        if let Err(e) = self.inner.session_store.delete(key).await {
            error!("Failed to delete {}: {}", key.as_str(), e);
        }
    }
}
