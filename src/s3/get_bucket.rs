use std::path::Path;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;

use crate::AppState;
use crate::store;

use super::S3Error;
use super::get_object;
use super::response::{
    self, CommonPrefix, ListBucketResult, ObjectEntry, VersioningConfiguration,
};

#[derive(Deserialize, Default)]
pub struct GetBucketParams {
    versioning: Option<String>,
    versions: Option<String>,
    prefix: Option<String>,
}

#[axum::debug_handler]
/// Dispatches bucket-level GETs: the `versioning` stub first, then
/// `ListObjectsV2` when the target is a directory, the `versions` stub,
/// and finally `GetObject` when a `prefix` resolves to a plain file.
pub async fn get_bucket(
    State(state): State<AppState>,
    UrlPath(bucket): UrlPath<String>,
    Query(params): Query<GetBucketParams>,
) -> Result<Response, S3Error> {
    if params.versioning.is_some() {
        return Ok(get_bucket_versioning());
    }

    let key = params.prefix.filter(|p| !p.is_empty()).unwrap_or_default();
    let path = store::resolve(&state.config.mount, &bucket, &key).map_err(|e| {
        tracing::error!(error = %e, bucket, "Invalid bucket path");
        S3Error::internal(StatusCode::BAD_REQUEST, &bucket)
    })?;

    let meta = tokio::fs::metadata(&path).await.map_err(|e| {
        tracing::warn!(error = %e, bucket, key, "Listing target not found");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &bucket)
    })?;

    if meta.is_dir() {
        return list_objects_v2(&bucket, &key, &path).await;
    }
    if params.versions.is_some() {
        return get_object::list_object_versions(&bucket, &key, &path).await;
    }
    get_object::serve_object(&key, &path).await
}

/// Versioning is never enabled; history is not retained.
pub(super) fn get_bucket_versioning() -> Response {
    response::xml(
        StatusCode::OK,
        "VersioningConfiguration",
        &VersioningConfiguration {
            status: "Suspended".to_string(),
        },
    )
}

/// Non-recursive listing of the directory at the resolved prefix path.
/// Files become `Contents`, subdirectories become `CommonPrefixes`.
pub(super) async fn list_objects_v2(
    bucket: &str,
    prefix: &str,
    path: &Path,
) -> Result<Response, S3Error> {
    let mut dir = tokio::fs::read_dir(path).await.map_err(|e| {
        tracing::error!(error = %e, bucket, "Failed to read listing directory");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, bucket)
    })?;

    let mut objects = Vec::new();
    let mut prefixes = Vec::new();
    while let Ok(Some(entry)) = dir.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(meta) = entry.metadata().await else {
            continue;
        };

        if meta.is_dir() {
            prefixes.push(CommonPrefix {
                prefix: format!("{name}/"),
            });
            continue;
        }

        let etag = store::object_etag(&entry.path()).map_err(|e| {
            tracing::error!(error = %e, key = name, "Object is missing its etag attribute");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, prefix)
        })?;
        objects.push(ObjectEntry {
            key: name,
            last_modified: meta.modified().map(super::iso8601).unwrap_or_default(),
            e_tag: super::quote_etag(&etag),
            size: meta.len(),
            owner: None,
            storage_class: "STANDARD".to_string(),
        });
    }

    objects.sort_by(|a, b| a.key.cmp(&b.key));
    prefixes.sort_by(|a, b| a.prefix.cmp(&b.prefix));

    Ok(response::xml(
        StatusCode::OK,
        "ListBucketResult",
        &ListBucketResult {
            name: bucket.to_string(),
            prefix: prefix.to_string(),
            key_count: objects.len(),
            max_keys: 1000,
            is_truncated: false,
            contents: objects,
            common_prefixes: prefixes,
        },
    ))
}
