use axum::{Json, http::StatusCode};
use serde::Serialize;

use crate::AppState;
use crate::store;

#[derive(Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: i64,
    pub mount_status: Option<String>,
}

#[axum::debug_handler]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> (StatusCode, Json<HealthCheckResponse>) {
    let staging = state.config.mount.join(store::STAGING_DIR);
    let mount_status = match tokio::fs::metadata(&staging).await {
        Ok(meta) if meta.is_dir() => Some("mounted".to_string()),
        _ => None,
    };

    let status = if mount_status.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthCheckResponse {
            status: status.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            mount_status,
        }),
    )
}
