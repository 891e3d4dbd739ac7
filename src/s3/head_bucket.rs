use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::AppState;
use crate::store;

use super::S3Error;

#[axum::debug_handler]
/// Implements `HeadBucket`: existence of the directory is existence of
/// the bucket.
pub async fn head_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<Response, S3Error> {
    let path = store::resolve(&state.config.mount, &bucket, "").map_err(|e| {
        tracing::error!(error = %e, bucket, "Invalid bucket name");
        S3Error::internal(StatusCode::BAD_REQUEST, &bucket)
    })?;

    if tokio::fs::metadata(&path).await.is_err() {
        tracing::warn!(bucket, "Bucket not found");
        return Err(S3Error::no_such_bucket(StatusCode::BAD_REQUEST, &bucket));
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .body(Body::empty())
        .unwrap_or_default())
}
