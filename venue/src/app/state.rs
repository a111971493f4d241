//! Application state and its publish/subscribe store

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use tracing::{debug, error};

use crate::models::deployment::Deployment;
use crate::models::project::Project;

/// Persisted authentication and selected-project identity
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub access_token: Option<String>,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("project_id", &self.project_id)
            .field("project_name", &self.project_name)
            .finish()
    }
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppState {
    pub session: Session,
    pub projects: Vec<Project>,
    /// Newest first
    pub deployments: Vec<Deployment>,
    pub is_loading: bool,
    pub error: Option<String>,
}

type Listener = Arc<dyn Fn(&AppState) + Send + Sync>;

/// Holds the current `AppState` and broadcasts a full snapshot to every
/// listener after each update.
///
/// Listeners run synchronously on the updating task, in registration order,
/// and must not update the store themselves.
pub struct StateStore {
    state: Mutex<AppState>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    // serializes update + broadcast so listeners see snapshots in update order
    publish: Mutex<()>,
    next_listener_id: AtomicU64,
}

impl StateStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(AppState::default()),
            listeners: Mutex::new(Vec::new()),
            publish: Mutex::new(()),
            next_listener_id: AtomicU64::new(0),
        })
    }

    pub fn snapshot(&self) -> AppState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply `f` to the state, then broadcast the result
    pub fn update<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        let _publish = self.publish.lock().unwrap_or_else(|e| e.into_inner());

        let (result, snapshot) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let result = f(&mut state);
            (result, state.clone())
        };

        self.broadcast(&snapshot);
        result
    }

    /// Register a listener. It is called once right away with the current
    /// state, then after every update until unsubscribed.
    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(&AppState) + Send + Sync + 'static,
    ) -> Subscription {
        let _publish = self.publish.lock().unwrap_or_else(|e| e.into_inner());

        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        let listener: Listener = Arc::new(listener);
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener.clone()));

        let snapshot = self.snapshot();
        notify(id, &listener, &snapshot);

        debug!("Listener {} subscribed", id);
        Subscription {
            store: Arc::downgrade(self),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn unsubscribe(&self, id: u64) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.retain(|(listener_id, _)| *listener_id != id);
        debug!("Listener {} unsubscribed", id);
    }

    fn broadcast(&self, snapshot: &AppState) {
        let listeners: Vec<(u64, Listener)> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for (id, listener) in &listeners {
            notify(*id, listener, snapshot);
        }
    }
}

/// A panicking listener is logged and skipped; the others still run.
fn notify(id: u64, listener: &Listener, snapshot: &AppState) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(snapshot))) {
        let msg = panic
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| panic.downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic");
        error!("State listener {} panicked: {}", id, msg);
    }
}

/// Handle returned by [`StateStore::subscribe`]. Dropping it keeps the
/// listener registered; call [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    store: Weak<StateStore>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}
