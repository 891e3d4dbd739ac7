use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;

use crate::AppState;
use crate::store;

use super::S3Error;

#[axum::debug_handler]
/// Implements `HeadObject`: the object's metadata headers with no body.
pub async fn head_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, S3Error> {
    let path = store::resolve(&state.config.mount, &bucket, &key).map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Invalid key value");
        S3Error::internal(StatusCode::BAD_REQUEST, &key)
    })?;

    let meta = tokio::fs::metadata(&path).await.map_err(|_| {
        tracing::warn!(bucket, key, "Object not found");
        S3Error::no_such_key(StatusCode::NOT_FOUND, &key)
    })?;

    let etag = store::object_etag(&path).map_err(|e| {
        tracing::error!(error = %e, key, "Object is missing its etag attribute");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &key)
    })?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, meta.len())
        .header(
            header::LAST_MODIFIED,
            meta.modified().map(super::rfc822).unwrap_or_default(),
        )
        .header(header::ETAG, super::quote_etag(&etag))
        .body(Body::empty())
        .unwrap_or_default())
}
