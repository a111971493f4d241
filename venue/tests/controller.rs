//! Controller flows and adaptive polling

mod common;

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{deployment, FakeApi, FakeConnector, Harness};
use venue::app::controller::{Controller, PollingOptions};
use venue::errors::VenueError;
use venue::models::deployment::DeploymentState;
use venue::models::project::Project;
use venue::storage::session::{MemorySessionStore, SessionKey};
use venue::tray::indicator::TrayIndicator;
use venue::tray::status::TrayStatus;

const FAST: Duration = Duration::from_secs(5);
const SLOW: Duration = Duration::from_secs(30);

async fn logged_in() -> Harness {
    let h = Harness::new();
    h.api.set_projects(vec![Project::new("p1", "demo")]);
    h.controller.set_access_token("tok").await;
    h
}

// =============================== SESSION FLOWS ================================== //

#[tokio::test(start_paused = true)]
async fn test_initialize_without_token_is_idle() {
    let h = Harness::new();
    h.controller.initialize().await;

    let state = h.controller.snapshot();
    assert!(!state.session.is_authenticated());
    assert!(h.connector.tokens().is_empty());
    assert_eq!(h.tray.statuses(), vec![TrayStatus::Gray]);
    assert!(!h.controller.poller_status().running);
    assert_eq!(h.api.project_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_initialize_with_token_loads_projects() {
    let h = Harness::with_store(MemorySessionStore::with_entries(&[(
        SessionKey::AccessToken,
        "tok",
    )]));
    h.api.set_projects(vec![Project::new("p1", "demo")]);

    h.controller.initialize().await;

    let state = h.controller.snapshot();
    assert_eq!(state.session.access_token.as_deref(), Some("tok"));
    assert_eq!(state.projects, vec![Project::new("p1", "demo")]);
    assert_eq!(h.connector.tokens(), vec!["tok".to_string()]);
    assert_eq!(h.api.deployment_calls(), 0);
    assert!(!h.controller.poller_status().running);
}

#[tokio::test(start_paused = true)]
async fn test_initialize_with_project_starts_polling() {
    let h = Harness::with_store(MemorySessionStore::with_entries(&[
        (SessionKey::AccessToken, "tok"),
        (SessionKey::ProjectId, "p1"),
        (SessionKey::ProjectName, "demo"),
    ]));
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Ready)]);

    h.controller.initialize().await;

    let state = h.controller.snapshot();
    assert_eq!(state.session.project_id.as_deref(), Some("p1"));
    assert_eq!(state.session.project_name.as_deref(), Some("demo"));
    assert_eq!(state.deployments.len(), 1);
    assert_eq!(h.api.project_calls(), 0);
    assert_eq!(h.api.deployment_calls(), 1);
    assert_eq!(h.tray.last(), Some(TrayStatus::Ready));
    assert_eq!(h.controller.poller_status().interval, Some(SLOW));
}

#[tokio::test(start_paused = true)]
async fn test_login_loads_projects() {
    let h = logged_in().await;

    assert_eq!(h.connector.tokens(), vec!["tok".to_string()]);
    assert_eq!(h.store.peek(SessionKey::AccessToken).as_deref(), Some("tok"));

    let state = h.controller.snapshot();
    assert_eq!(state.session.access_token.as_deref(), Some("tok"));
    assert_eq!(state.projects, vec![Project::new("p1", "demo")]);
    assert!(!state.is_loading);
    assert_eq!(state.error, None);
    assert_eq!(h.api.project_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_project_load_keeps_previous_projects() {
    let h = logged_in().await;
    h.api.fail_projects(403, "Not authorized");

    h.controller.load_projects().await;

    let state = h.controller.snapshot();
    assert_eq!(state.projects, vec![Project::new("p1", "demo")]);
    assert!(!state.is_loading);
    let error = state.error.expect("error recorded");
    assert!(!error.is_empty());
    assert!(error.contains("403"));

    // next successful load clears the error
    h.api.set_projects(vec![Project::new("p2", "other")]);
    h.controller.load_projects().await;
    let state = h.controller.snapshot();
    assert_eq!(state.error, None);
    assert_eq!(state.projects, vec![Project::new("p2", "other")]);
}

#[tokio::test(start_paused = true)]
async fn test_load_projects_without_login_is_noop() {
    let h = Harness::new();
    h.controller.load_projects().await;

    assert_eq!(h.api.project_calls(), 0);
    assert!(!h.controller.snapshot().is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_select_project_requires_login() {
    let h = Harness::new();
    let result = h.controller.select_project("p1", "demo").await;

    assert!(matches!(result, Err(VenueError::NotAuthenticated(_))));
    assert_eq!(h.controller.snapshot().session.project_id, None);
    assert_eq!(h.store.peek(SessionKey::ProjectId), None);
}

#[tokio::test(start_paused = true)]
async fn test_change_project_keeps_token() {
    let h = logged_in().await;
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Building)]);
    h.controller.select_project("p1", "demo").await.unwrap();

    h.controller.change_project().await;

    let state = h.controller.snapshot();
    assert_eq!(state.session.access_token.as_deref(), Some("tok"));
    assert_eq!(state.session.project_id, None);
    assert_eq!(state.session.project_name, None);
    assert!(state.deployments.is_empty());
    assert!(!h.controller.poller_status().running);
    assert_eq!(h.tray.last(), Some(TrayStatus::Gray));
    assert_eq!(h.store.peek(SessionKey::AccessToken).as_deref(), Some("tok"));
    assert_eq!(h.store.peek(SessionKey::ProjectId), None);
    assert_eq!(h.store.peek(SessionKey::ProjectName), None);
    // project list reloaded
    assert_eq!(h.api.project_calls(), 2);

    let calls = h.api.deployment_calls();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.api.deployment_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_logout_clears_everything() {
    let h = logged_in().await;
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Ready)]);
    h.controller.select_project("p1", "demo").await.unwrap();

    h.controller.logout().await;

    let state = h.controller.snapshot();
    assert_eq!(state.session.access_token, None);
    assert_eq!(state.session.project_id, None);
    assert_eq!(state.session.project_name, None);
    assert!(state.deployments.is_empty());
    assert!(state.projects.is_empty());
    assert!(!h.controller.poller_status().running);
    assert_eq!(h.tray.last(), Some(TrayStatus::Gray));
    for key in [
        SessionKey::AccessToken,
        SessionKey::ProjectId,
        SessionKey::ProjectName,
    ] {
        assert_eq!(h.store.peek(key), None);
    }

    let calls = h.api.deployment_calls();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.api.deployment_calls(), calls);

    // refresh after logout does nothing
    h.controller.refresh().await;
    assert_eq!(h.api.deployment_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_logout_when_logged_out() {
    let h = Harness::new();
    h.controller.logout().await;

    let state = h.controller.snapshot();
    assert_eq!(state.session.access_token, None);
    assert!(state.deployments.is_empty());
    assert!(!h.controller.poller_status().running);
}

// ============================== ADAPTIVE POLLING ================================= //

#[tokio::test(start_paused = true)]
async fn test_select_project_with_building_deployment_polls_fast() {
    let h = logged_in().await;
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Building)]);

    h.controller.select_project("p1", "demo").await.unwrap();

    let state = h.controller.snapshot();
    assert_eq!(state.deployments.len(), 1);
    assert_eq!(state.deployments[0].state, DeploymentState::Building);
    assert!(!state.is_loading);
    assert_eq!(h.tray.last(), Some(TrayStatus::Building));
    assert_eq!(h.store.peek(SessionKey::ProjectId).as_deref(), Some("p1"));
    assert_eq!(h.store.peek(SessionKey::ProjectName).as_deref(), Some("demo"));

    let poller = h.controller.poller_status();
    assert!(poller.running);
    assert_eq!(poller.interval, Some(FAST));
    // initial slow schedule, then one reschedule on the idle -> active flip
    assert_eq!(poller.schedules, 2);
}

#[tokio::test(start_paused = true)]
async fn test_build_finishing_reschedules_slow() {
    let h = logged_in().await;
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Building)]);
    h.controller.select_project("p1", "demo").await.unwrap();
    assert_eq!(h.controller.poller_status().schedules, 2);

    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Ready)]);
    tokio::time::sleep(FAST + Duration::from_secs(1)).await;

    assert_eq!(h.api.deployment_calls(), 2);
    assert_eq!(h.tray.last(), Some(TrayStatus::Ready));
    let poller = h.controller.poller_status();
    assert_eq!(poller.interval, Some(SLOW));
    assert_eq!(poller.schedules, 3);

    // slow cadence from here on
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(h.api.deployment_calls(), 2);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.api.deployment_calls(), 3);
    assert_eq!(h.controller.poller_status().schedules, 3);
}

#[tokio::test(start_paused = true)]
async fn test_steady_idle_never_reschedules() {
    let h = logged_in().await;
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Ready)]);
    h.controller.select_project("p1", "demo").await.unwrap();

    let poller = h.controller.poller_status();
    assert_eq!(poller.interval, Some(SLOW));
    assert_eq!(poller.schedules, 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(h.api.deployment_calls(), 3);
    assert_eq!(h.controller.poller_status().schedules, 1);
}

#[tokio::test(start_paused = true)]
async fn test_steady_active_never_reschedules() {
    let h = logged_in().await;
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Queued)]);
    h.controller.select_project("p1", "demo").await.unwrap();
    assert_eq!(h.controller.poller_status().schedules, 2);

    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Building)]);
    tokio::time::sleep(Duration::from_secs(16)).await;

    assert_eq!(h.api.deployment_calls(), 4);
    let poller = h.controller.poller_status();
    assert_eq!(poller.interval, Some(FAST));
    assert_eq!(poller.schedules, 2);
}

#[tokio::test(start_paused = true)]
async fn test_tray_follows_latest_deployment_only() {
    let h = logged_in().await;
    h.api.set_deployments(vec![
        deployment("d2", DeploymentState::Error),
        deployment("d1", DeploymentState::Building),
    ]);
    h.controller.select_project("p1", "demo").await.unwrap();

    assert_eq!(h.tray.last(), Some(TrayStatus::Error));
    // an older deployment is still building, so the fast cadence applies
    assert_eq!(h.controller.poller_status().interval, Some(FAST));
}

#[tokio::test(start_paused = true)]
async fn test_empty_deployment_list_is_gray() {
    let h = logged_in().await;
    h.api.set_deployments(Vec::new());
    h.controller.select_project("p1", "demo").await.unwrap();

    assert_eq!(h.tray.last(), Some(TrayStatus::Gray));
    assert_eq!(h.controller.poller_status().interval, Some(SLOW));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_keeps_list_and_cadence() {
    let h = logged_in().await;
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Building)]);
    h.controller.select_project("p1", "demo").await.unwrap();
    let tray_updates = h.tray.statuses().len();

    h.api.fail_deployments(500, "Internal Server Error");
    h.controller.refresh().await;

    let state = h.controller.snapshot();
    assert_eq!(state.deployments.len(), 1);
    assert_eq!(state.deployments[0].state, DeploymentState::Building);
    assert!(!state.is_loading);
    assert_eq!(state.error, None);
    assert_eq!(h.tray.statuses().len(), tray_updates);

    let poller = h.controller.poller_status();
    assert_eq!(poller.interval, Some(FAST));
    assert_eq!(poller.schedules, 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_fetches_outside_cadence() {
    let h = logged_in().await;
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Ready)]);
    h.controller.select_project("p1", "demo").await.unwrap();

    h.api.set_deployments(vec![
        deployment("d2", DeploymentState::Ready),
        deployment("d1", DeploymentState::Ready),
    ]);
    h.controller.refresh().await;

    assert_eq!(h.api.deployment_calls(), 2);
    assert_eq!(h.controller.snapshot().deployments.len(), 2);
    assert_eq!(h.controller.poller_status().schedules, 1);
}

#[tokio::test(start_paused = true)]
async fn test_response_after_logout_is_discarded() {
    let h = logged_in().await;
    h.api
        .set_deployments(vec![deployment("d1", DeploymentState::Ready)]);
    h.controller.select_project("p1", "demo").await.unwrap();

    h.api.delay_deployments(Duration::from_secs(10));
    h.api
        .set_deployments(vec![deployment("d2", DeploymentState::Building)]);
    let controller = h.controller.clone();
    let in_flight = tokio::spawn(async move { controller.refresh().await });
    tokio::task::yield_now().await;

    h.controller.logout().await;
    in_flight.await.unwrap();

    let state = h.controller.snapshot();
    assert!(state.deployments.is_empty());
    assert_eq!(state.session.project_id, None);
    assert_eq!(h.tray.last(), Some(TrayStatus::Gray));
    assert!(!h.controller.poller_status().running);
}

/// Blocks the first `Building` update until released
struct GatedTray {
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
    statuses: Mutex<Vec<TrayStatus>>,
}

impl TrayIndicator for GatedTray {
    fn set_status(&self, status: TrayStatus) {
        if status == TrayStatus::Building {
            if let Some(entered) = self.entered.lock().unwrap().take() {
                entered.send(()).unwrap();
                let release = self.release.lock().unwrap().take();
                if let Some(release) = release {
                    release.recv().unwrap();
                }
            }
        }
        self.statuses.lock().unwrap().push(status);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_change_project_during_fetch_keeps_timer_stopped() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let tray = Arc::new(GatedTray {
        entered: Mutex::new(Some(entered_tx)),
        release: Mutex::new(Some(release_rx)),
        statuses: Mutex::new(Vec::new()),
    });
    let api = FakeApi::new();
    api.set_projects(vec![Project::new("p1", "demo")]);
    api.set_deployments(vec![deployment("d1", DeploymentState::Building)]);
    let controller = Controller::new(
        FakeConnector::new(api.clone()),
        Arc::new(MemorySessionStore::new()),
        tray.clone(),
        PollingOptions::default(),
    );
    controller.set_access_token("tok").await;

    // the fetch has published its deployments and is now stuck in the tray
    let selecting = controller.clone();
    let select = tokio::spawn(async move { selecting.select_project("p1", "demo").await });
    tokio::task::spawn_blocking(move || entered_rx.recv())
        .await
        .unwrap()
        .unwrap();

    let changing = controller.clone();
    let change = tokio::spawn(async move { changing.change_project().await });
    for _ in 0..500 {
        if controller.snapshot().session.project_id.is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(controller.snapshot().session.project_id, None);
    assert!(!controller.poller_status().running);

    release_tx.send(()).unwrap();
    select.await.unwrap().unwrap();
    change.await.unwrap();

    let state = controller.snapshot();
    assert_eq!(state.session.project_id, None);
    assert!(state.deployments.is_empty());
    assert!(!controller.poller_status().running);
    assert_eq!(tray.statuses.lock().unwrap().last(), Some(&TrayStatus::Gray));
}

// ================================ SUBSCRIPTION ================================== //

#[tokio::test(start_paused = true)]
async fn test_subscriber_sees_every_state() {
    let h = Harness::new();
    h.api.set_projects(vec![Project::new("p1", "demo")]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = h.controller.subscribe(move |state| {
        sink.lock()
            .unwrap()
            .push((state.session.is_authenticated(), state.is_loading, state.projects.len()))
    });

    h.controller.set_access_token("tok").await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (false, false, 0), // on subscribe
            (true, false, 0),  // token stored
            (true, true, 0),   // loading projects
            (true, false, 1),  // projects loaded
        ]
    );

    subscription.unsubscribe();
    h.controller.logout().await;
    assert_eq!(seen.lock().unwrap().len(), 4);
}
