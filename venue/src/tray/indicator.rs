//! Tray indicator sinks

use std::sync::Mutex;

use tokio::process::Command;
use tracing::{error, info, warn};

use crate::tray::status::TrayStatus;

/// Receives tray status updates. Fire-and-forget: failures are logged by the
/// implementation and never reach the caller.
pub trait TrayIndicator: Send + Sync {
    fn set_status(&self, status: TrayStatus);
}

/// Logs every status change
#[derive(Debug, Default)]
pub struct LogTray;

impl TrayIndicator for LogTray {
    fn set_status(&self, status: TrayStatus) {
        info!(status = status.as_str(), "Tray status updated");
    }
}

/// Runs a user-supplied program with the status tag as its argument. The
/// program only runs when the status differs from the last one it was given.
#[derive(Debug)]
pub struct CommandTray {
    program: String,
    last: Mutex<Option<TrayStatus>>,
}

impl CommandTray {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            last: Mutex::new(None),
        }
    }

    fn changed(&self, status: TrayStatus) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if *last == Some(status) {
            return false;
        }
        *last = Some(status);
        true
    }
}

impl TrayIndicator for CommandTray {
    fn set_status(&self, status: TrayStatus) {
        if !self.changed(status) {
            return;
        }
        info!(status = status.as_str(), "Tray status updated");

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, skipping tray command");
            return;
        };

        let program = self.program.clone();
        runtime.spawn(async move {
            match Command::new(&program).arg(status.as_str()).status().await {
                Ok(exit) if exit.success() => {}
                Ok(exit) => warn!("Tray command {} exited with {}", program, exit),
                Err(e) => error!("Failed to run tray command {}: {}", program, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tray_runs_on_change_only() {
        let tray = CommandTray::new("venue-tray");

        assert!(tray.changed(TrayStatus::Building));
        assert!(!tray.changed(TrayStatus::Building));
        assert!(!tray.changed(TrayStatus::Building));
        assert!(tray.changed(TrayStatus::Ready));
        assert!(tray.changed(TrayStatus::Building));
    }
}
