//! Health and version endpoints
//!
//! - /health, /healthz - Liveness probe, always 200 while the process serves
//! - /version - Build information for deployment verification

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::response::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Seconds since this instance started
    pub uptime: u64,
    pub timestamp: String,
    /// "development" or "production"
    pub mode: &'static str,
    pub instance_id: String,
    /// Which store backs users and posts ("mongodb" or "memory")
    pub storage: &'static str,
}

/// Version information for deployment verification
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: &AppState) -> Response<BoxBody> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        instance_id: state.args.instance_id.to_string(),
        storage: state.storage.as_str(),
    };

    json_response(StatusCode::OK, &response)
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<BoxBody> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "wicket",
    };

    json_response(StatusCode::OK, &response)
}
