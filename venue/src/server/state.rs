//! Server state

use crate::app::controller::Controller;

/// Server state shared across handlers
pub struct ServerState {
    pub controller: Controller,

    /// Dashboard host for deployment links
    pub dashboard_url: String,

    /// Deployments API the controller talks to
    pub api_base_url: String,
}

impl ServerState {
    pub fn new(
        controller: Controller,
        dashboard_url: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Self {
        Self {
            controller,
            dashboard_url: dashboard_url.into(),
            api_base_url: api_base_url.into(),
        }
    }
}
