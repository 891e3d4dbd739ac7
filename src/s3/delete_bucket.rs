use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::AppState;
use crate::store;

use super::S3Error;

#[axum::debug_handler]
/// Implements `DeleteBucket`. Only empty buckets can be removed.
pub async fn delete_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<Response, S3Error> {
    let path = store::resolve(&state.config.mount, &bucket, "").map_err(|e| {
        tracing::error!(error = %e, bucket, "Invalid bucket name");
        S3Error::internal(StatusCode::BAD_REQUEST, &bucket)
    })?;

    if tokio::fs::metadata(&path).await.is_err() {
        tracing::warn!(bucket, "Bucket not found");
        return Err(S3Error::no_such_bucket(StatusCode::NOT_FOUND, &bucket));
    }

    let mut entries = tokio::fs::read_dir(&path).await.map_err(|e| {
        tracing::error!(error = %e, bucket, "Failed to read bucket directory");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &bucket)
    })?;
    if entries
        .next_entry()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, bucket, "Failed to read bucket directory");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &bucket)
        })?
        .is_some()
    {
        return Err(S3Error::bucket_not_empty(&bucket));
    }

    tokio::fs::remove_dir(&path).await.map_err(|e| {
        tracing::error!(error = %e, bucket, "Failed to remove bucket directory");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &bucket)
    })?;

    tracing::debug!(bucket, "Bucket deleted");
    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::empty())
        .unwrap_or_default())
}
