//! Application runtime options

use std::time::Duration;

use tracing::warn;

use crate::app::controller::PollingOptions;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// Remote API configuration
    pub api: ApiOptions,

    /// Deployment polling cadence
    pub polling: PollingOptions,

    /// Local control server
    pub server: ServerOptions,

    /// Program invoked on tray status changes
    pub tray_command: Option<String>,

    /// Print state changes to stdout
    pub render_state: bool,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

/// Shortest poll interval accepted from settings
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

fn poll_interval(name: &str, configured: Duration) -> Duration {
    if configured < MIN_POLL_INTERVAL {
        warn!(
            "polling.{} of {:?} is below the minimum, using {:?}",
            name, configured, MIN_POLL_INTERVAL
        );
        return MIN_POLL_INTERVAL;
    }
    configured
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(StorageLayout::default(), &Settings::default())
    }
}

impl AppOptions {
    pub fn from_settings(layout: StorageLayout, settings: &Settings) -> Self {
        Self {
            layout,
            api: ApiOptions {
                base_url: settings.api.base_url.clone(),
                dashboard_url: settings.api.dashboard_url.clone(),
                request_timeout: Duration::from_secs(settings.api.request_timeout_secs),
                project_limit: settings.polling.project_limit,
            },
            polling: PollingOptions {
                fast_interval: poll_interval(
                    "fast_interval_ms",
                    settings.polling.fast_interval(),
                ),
                slow_interval: poll_interval(
                    "slow_interval_ms",
                    settings.polling.slow_interval(),
                ),
                deployment_limit: settings.polling.deployment_limit,
            },
            server: ServerOptions {
                enabled: settings.server.enabled,
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            tray_command: settings.tray.command.clone(),
            render_state: true,
            max_shutdown_delay: Duration::from_secs(10),
        }
    }
}

/// Remote API options
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub base_url: String,

    /// Dashboard host for deployment links
    pub dashboard_url: String,

    pub request_timeout: Duration,

    /// Projects fetched per project-list request
    pub project_limit: u32,
}

/// Local control server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub enabled: bool,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.polling.fast_interval_ms = 2_000;
        settings.server.port = 5000;
        settings.tray.command = Some("venue-tray".to_string());

        let options = AppOptions::from_settings(StorageLayout::new("/tmp/venue"), &settings);
        assert_eq!(options.polling.fast_interval, Duration::from_secs(2));
        assert_eq!(options.polling.slow_interval, Duration::from_secs(30));
        assert_eq!(options.polling.deployment_limit, 10);
        assert_eq!(options.api.project_limit, 100);
        assert_eq!(options.server.port, 5000);
        assert_eq!(options.tray_command.as_deref(), Some("venue-tray"));
    }

    #[test]
    fn test_poll_intervals_have_a_floor() {
        let mut settings = Settings::default();
        settings.polling.fast_interval_ms = 0;
        settings.polling.slow_interval_ms = 250;

        let options = AppOptions::from_settings(StorageLayout::new("/tmp/venue"), &settings);
        assert_eq!(options.polling.fast_interval, MIN_POLL_INTERVAL);
        assert_eq!(options.polling.slow_interval, MIN_POLL_INTERVAL);
    }
}
