use std::path::Path;

use axum::body::Body;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::AppState;
use crate::store;

use super::S3Error;
use super::get_bucket;
use super::response::{self, ListVersionsResult, ObjectVersionEntry, Owner};

#[derive(Deserialize, Default)]
pub struct GetObjectParams {
    versioning: Option<String>,
    versions: Option<String>,
    prefix: Option<String>,
}

#[axum::debug_handler]
/// Dispatches key-level GETs with the same precedence as bucket GETs:
/// versioning stub, directory listing, versions stub, object read.
pub async fn get_object(
    State(state): State<AppState>,
    UrlPath((bucket, key)): UrlPath<(String, String)>,
    Query(params): Query<GetObjectParams>,
) -> Result<Response, S3Error> {
    if params.versioning.is_some() {
        return Ok(get_bucket::get_bucket_versioning());
    }

    let key = params.prefix.filter(|p| !p.is_empty()).unwrap_or(key);
    let path = store::resolve(&state.config.mount, &bucket, &key).map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Invalid key value");
        S3Error::internal(StatusCode::BAD_REQUEST, &key)
    })?;

    if let Ok(meta) = tokio::fs::metadata(&path).await
        && meta.is_dir()
    {
        return get_bucket::list_objects_v2(&bucket, &key, &path).await;
    }
    if params.versions.is_some() {
        return list_object_versions(&bucket, &key, &path).await;
    }
    serve_object(&key, &path).await
}

/// Streams the object file with its metadata headers.
pub(super) async fn serve_object(key: &str, path: &Path) -> Result<Response, S3Error> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            tracing::warn!(key, "Object not found");
            S3Error::no_such_key(StatusCode::BAD_REQUEST, key)
        } else {
            tracing::error!(error = %e, key, "Failed to open object");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        }
    })?;
    let meta = file.metadata().await.map_err(|e| {
        tracing::error!(error = %e, key, "Failed to stat object");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;
    if meta.is_dir() {
        return Err(S3Error::no_such_key(StatusCode::BAD_REQUEST, key));
    }

    let etag = store::object_etag(path).map_err(|e| {
        tracing::error!(error = %e, key, "Object is missing its etag attribute");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;
    let content_type = mime_guess::from_path(path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, meta.len())
        .header(header::CONTENT_TYPE, content_type.essence_str())
        .header(
            header::LAST_MODIFIED,
            meta.modified().map(super::rfc822).unwrap_or_default(),
        )
        .header(header::ETAG, super::quote_etag(&etag))
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| {
            tracing::error!(error = %e, key, "Failed to build object response");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })
}

/// Version history is not retained; answers with a single synthetic
/// version describing the current file.
pub(super) async fn list_object_versions(
    bucket: &str,
    key: &str,
    path: &Path,
) -> Result<Response, S3Error> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| {
        tracing::warn!(error = %e, key, "Object not found");
        S3Error::no_such_key(StatusCode::BAD_REQUEST, key)
    })?;

    Ok(response::xml(
        StatusCode::OK,
        "ListVersionsResult",
        &ListVersionsResult {
            name: bucket.to_string(),
            prefix: key.to_string(),
            key_marker: String::new(),
            next_version_id_marker: String::new(),
            version_id_marker: String::new(),
            max_keys: 1,
            is_truncated: false,
            version: vec![ObjectVersionEntry {
                key: key.to_string(),
                last_modified: meta.modified().map(super::iso8601).unwrap_or_default(),
                e_tag: "xxx".to_string(),
                size: meta.len(),
                owner: Owner::stub(),
                storage_class: "STANDARD".to_string(),
                is_latest: true,
                version_id: "xxx".to_string(),
            }],
        },
    ))
}
