//! Build metadata

use serde::{Deserialize, Serialize};

/// User agent sent to the deployments API
pub const USER_AGENT: &str = concat!("venue/", env!("CARGO_PKG_VERSION"));

/// What `--version` and `GET /version` report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
    pub user_agent: String,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
        user_agent: USER_AGENT.to_string(),
    }
}
