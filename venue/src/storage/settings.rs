//! Settings file management

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::VenueError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// User settings, read from `settings.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Write logs as JSON lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Also write a daily-rolling log file under the storage directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Remote API configuration
    #[serde(default)]
    pub api: ApiSettings,

    /// Deployment polling configuration
    #[serde(default)]
    pub polling: PollingSettings,

    /// Local control server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Tray indicator configuration
    #[serde(default)]
    pub tray: TraySettings,
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Dashboard host used to build deployment links
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.vercel.com".to_string()
}

fn default_dashboard_url() -> String {
    "https://vercel.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            dashboard_url: default_dashboard_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Polling cadence and page sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Interval while a deployment is building, queued or initializing
    #[serde(default = "default_fast_interval")]
    pub fast_interval_ms: u64,

    /// Interval while every deployment is settled
    #[serde(default = "default_slow_interval")]
    pub slow_interval_ms: u64,

    #[serde(default = "default_deployment_limit")]
    pub deployment_limit: u32,

    #[serde(default = "default_project_limit")]
    pub project_limit: u32,
}

fn default_fast_interval() -> u64 {
    5_000
}

fn default_slow_interval() -> u64 {
    30_000
}

fn default_deployment_limit() -> u32 {
    10
}

fn default_project_limit() -> u32 {
    100
}

impl PollingSettings {
    pub fn fast_interval(&self) -> Duration {
        Duration::from_millis(self.fast_interval_ms)
    }

    pub fn slow_interval(&self) -> Duration {
        Duration::from_millis(self.slow_interval_ms)
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            fast_interval_ms: default_fast_interval(),
            slow_interval_ms: default_slow_interval(),
            deployment_limit: default_deployment_limit(),
            project_limit: default_project_limit(),
        }
    }
}

/// Local control server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    4747
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// Tray indicator settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraySettings {
    /// Program run with the status tag as its only argument whenever the
    /// tray status changes, e.g. a script that swaps a status-bar icon
    #[serde(default)]
    pub command: Option<String>,
}

/// Load settings, writing the defaults out if the file does not exist yet
pub async fn load_or_init(settings_file: &File) -> Result<Settings, VenueError> {
    if let Some(settings) = settings_file
        .read_json_opt::<Settings>()
        .await
        .with_context(|| format!("reading {}", settings_file.path().display()))?
    {
        return Ok(settings);
    }

    info!(
        "No settings found, writing defaults to {}",
        settings_file.path().display()
    );
    let settings = Settings::default();
    settings_file.write_json(&settings).await?;
    Ok(settings)
}
