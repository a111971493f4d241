//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::controller::Controller;
use crate::app::options::AppOptions;
use crate::app::render::StatePrinter;
use crate::errors::VenueError;
use crate::http::api::VercelConnector;
use crate::http::client::HttpClient;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::storage::session::FileSessionStore;
use crate::tray::indicator::{CommandTray, LogTray, TrayIndicator};

/// Run Venue until the shutdown signal fires
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), VenueError> {
    info!("Initializing Venue...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), &options);

    if let Err(e) = init(&options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start Venue: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), VenueError> {
    let controller = init_controller(options).await?;
    shutdown_manager.with_controller(controller.clone())?;

    if options.render_state {
        let printer = StatePrinter::new(options.api.dashboard_url.clone());
        // lives for the whole process
        let _subscription = controller.subscribe(move |state| printer.print(state));
    }

    controller.initialize().await;

    if options.server.enabled {
        init_control_server(options, controller, shutdown_manager, shutdown_tx.subscribe())
            .await?;
    }

    Ok(())
}

async fn init_controller(options: &AppOptions) -> Result<Controller, VenueError> {
    let http_client = HttpClient::new(&options.api.base_url, options.api.request_timeout)?;
    let connector = Arc::new(VercelConnector::new(http_client, options.api.project_limit));

    let session_store = Arc::new(FileSessionStore::open(options.layout.session_file()).await?);

    let tray: Arc<dyn TrayIndicator> = match &options.tray_command {
        Some(program) => Arc::new(CommandTray::new(program.clone())),
        None => Arc::new(LogTray),
    };

    Ok(Controller::new(connector, session_store, tray, options.polling.clone()))
}

async fn init_control_server(
    options: &AppOptions,
    controller: Controller,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), VenueError> {
    info!("Initializing control server...");

    let server_state = ServerState::new(
        controller,
        options.api.dashboard_url.clone(),
        options.api.base_url.clone(),
    );

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    max_shutdown_delay: std::time::Duration,
    controller: Option<Controller>,
    server_handle: Option<JoinHandle<Result<(), VenueError>>>,
}

impl ShutdownManager {
    fn new(shutdown_tx: broadcast::Sender<()>, options: &AppOptions) -> Self {
        Self {
            shutdown_tx,
            max_shutdown_delay: options.max_shutdown_delay,
            controller: None,
            server_handle: None,
        }
    }

    fn with_controller(&mut self, controller: Controller) -> Result<(), VenueError> {
        if self.controller.is_some() {
            return Err(VenueError::ShutdownError("controller already set".to_string()));
        }
        self.controller = Some(controller);
        Ok(())
    }

    fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), VenueError>>,
    ) -> Result<(), VenueError> {
        if self.server_handle.is_some() {
            return Err(VenueError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), VenueError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(self.max_shutdown_delay, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), VenueError> {
        info!("Shutting down Venue...");

        // 1. Poll timer
        if let Some(controller) = self.controller.take() {
            controller.shutdown();
        }

        // 2. Control server
        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| VenueError::ShutdownError(e.to_string()))??;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
