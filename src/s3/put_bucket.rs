use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;

use crate::AppState;
use crate::store;

use super::S3Error;

#[axum::debug_handler]
/// Implements `CreateBucket`: a single directory under the mount root.
pub async fn create_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<Response, S3Error> {
    let path = store::resolve(&state.config.mount, &bucket, "").map_err(|e| {
        tracing::error!(error = %e, bucket, "Invalid bucket name");
        S3Error::internal(StatusCode::BAD_REQUEST, &bucket)
    })?;

    if tokio::fs::metadata(&path).await.is_ok() {
        return Err(S3Error::bucket_already_owned(&bucket));
    }

    tokio::fs::create_dir(&path).await.map_err(|e| {
        tracing::error!(error = %e, bucket, "Failed to create bucket directory");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &bucket)
    })?;

    tracing::debug!(bucket, "Bucket created");
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::LOCATION, format!("/{bucket}"))
        .header(header::CONTENT_LENGTH, 0)
        .header(header::SERVER, "AmazonS3")
        .body(Body::empty())
        .unwrap_or_default())
}
