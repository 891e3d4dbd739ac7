use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;

use crate::AppState;
use crate::store;

use super::S3Error;

#[axum::debug_handler]
/// Implements `DeleteObject`, reclaiming empty parent directories the
/// key left behind.
pub async fn delete_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, S3Error> {
    remove_object(&state, &bucket, &key).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, 0)
        .body(Body::empty())
        .unwrap_or_default())
}

/// Removes one object file and cleans up the directories between it and
/// the bucket root. Shared with the bulk `DeleteObjects` handler.
pub(super) async fn remove_object(
    state: &AppState,
    bucket: &str,
    key: &str,
) -> Result<(), S3Error> {
    let path = store::resolve(&state.config.mount, bucket, key).map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Invalid key value");
        S3Error::internal(StatusCode::BAD_REQUEST, key)
    })?;

    let meta = tokio::fs::metadata(&path).await.map_err(|_| {
        tracing::warn!(bucket, key, "Object not found");
        S3Error::no_such_key(StatusCode::NOT_FOUND, key)
    })?;

    let removal = if meta.is_dir() {
        tokio::fs::remove_dir_all(&path).await
    } else {
        tokio::fs::remove_file(&path).await
    };
    removal.map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Failed to remove object");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;

    let stop_root = store::resolve(&state.config.mount, bucket, "").map_err(|e| {
        tracing::error!(error = %e, bucket, "Invalid bucket name");
        S3Error::internal(StatusCode::BAD_REQUEST, bucket)
    })?;
    store::cleanup_empty_dirs(&path, &stop_root).await;

    tracing::debug!(bucket, key, "Object deleted");
    Ok(())
}
