use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use md5::{Digest, Md5};
use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

use crate::AppState;
use crate::store;

use super::S3Error;
use super::response::{self, CopyObjectResult};

#[serde_as]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadPartParams {
    #[serde_as(as = "DisplayFromStr")]
    part_number: u16,
    upload_id: String,
}

#[derive(Deserialize, Default, Debug)]
pub struct PutObjectParams {
    #[serde(flatten)]
    upload_part: Option<UploadPartParams>,
}

#[axum::debug_handler]
/// `PutObject`, plus the header- and query-dispatched variants sharing
/// the verb: `CopyObject` (`X-Amz-Copy-Source` present) and `UploadPart`
/// (`?partNumber&uploadId`).
pub async fn put_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<PutObjectParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, S3Error> {
    if let Some(source) = headers.get("x-amz-copy-source") {
        let source = source.to_str().map_err(|e| {
            tracing::error!(error = %e, "Copy source header is not valid text");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &key)
        })?;
        return copy_object(&state, &bucket, &key, source).await;
    }

    if let Some(part) = params.upload_part {
        return upload_part(&state, &part, body).await;
    }

    store_object(&state, &bucket, &key, body).await
}

async fn store_object(
    state: &AppState,
    bucket: &str,
    key: &str,
    body: Bytes,
) -> Result<Response, S3Error> {
    let path = store::resolve(&state.config.mount, bucket, key).map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Invalid key value");
        S3Error::internal(StatusCode::BAD_REQUEST, key)
    })?;

    // Objects are never silently replaced.
    if tokio::fs::metadata(&path).await.is_ok() {
        tracing::warn!(bucket, key, "Target path already exists");
        return Err(S3Error::internal(StatusCode::BAD_REQUEST, key));
    }

    // A key with a trailing slash creates an empty "directory" entry.
    if key.ends_with('/') {
        tokio::fs::create_dir_all(&path).await.map_err(|e| {
            tracing::error!(error = %e, bucket, key, "Failed to create directory key");
            S3Error::internal(StatusCode::BAD_REQUEST, key)
        })?;
        return Ok(empty_ok());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            tracing::error!(error = %e, bucket, key, "Failed to create parent directories");
            S3Error::internal(StatusCode::BAD_REQUEST, key)
        })?;
    }

    let etag = hex::encode(Md5::digest(&body));
    tokio::fs::write(&path, &body).await.map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Failed to write object");
        S3Error::internal(StatusCode::BAD_REQUEST, key)
    })?;
    store::set_object_etag(&path, &etag).map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Failed to set etag attribute");
        S3Error::internal(StatusCode::BAD_REQUEST, key)
    })?;

    tracing::debug!(bucket, key, etag, "Stored object");
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, 0)
        .header(header::ETAG, super::quote_etag(&etag))
        .body(Body::empty())
        .unwrap_or_default())
}

/// Copies the source object byte for byte and propagates its stored
/// ETag, so the destination still advertises the original upload's MD5.
async fn copy_object(
    state: &AppState,
    bucket: &str,
    key: &str,
    source: &str,
) -> Result<Response, S3Error> {
    let decoded = percent_encoding::percent_decode_str(&source.replace('+', " "))
        .decode_utf8()
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to decode copy source");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?
        .into_owned();
    let trimmed = decoded.trim_start_matches('/');
    let (source_bucket, source_key) = trimmed.split_once('/').unwrap_or((trimmed, ""));

    let source_path =
        store::resolve(&state.config.mount, source_bucket, source_key).map_err(|e| {
            tracing::error!(error = %e, source = trimmed, "Invalid copy source");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;
    let etag = store::object_etag(&source_path).map_err(|e| {
        tracing::error!(error = %e, source = trimmed, "Copy source has no etag attribute");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;

    let path = store::resolve(&state.config.mount, bucket, key).map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Invalid key value");
        S3Error::internal(StatusCode::BAD_REQUEST, key)
    })?;

    if path != source_path {
        let mut source_file = tokio::fs::File::open(&source_path).await.map_err(|e| {
            tracing::error!(error = %e, source = trimmed, "Failed to open copy source");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                tracing::error!(error = %e, bucket, key, "Failed to create parent directories");
                S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
            })?;
        }

        let mut target = tokio::fs::File::create(&path).await.map_err(|e| {
            tracing::error!(error = %e, bucket, key, "Failed to create copy target");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;
        tokio::io::copy(&mut source_file, &mut target)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket, key, "Failed to copy object bytes");
                S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
            })?;
        target.sync_all().await.map_err(|e| {
            tracing::error!(error = %e, bucket, key, "Failed to sync copy target");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;

        store::set_object_etag(&path, &etag).map_err(|e| {
            tracing::error!(error = %e, bucket, key, "Failed to set etag attribute");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;
    }

    let meta = tokio::fs::metadata(&path).await.map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Failed to stat copy target");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;

    tracing::debug!(bucket, key, source = trimmed, "Copied object");
    Ok(response::xml(
        StatusCode::OK,
        "CopyObjectResult",
        &CopyObjectResult {
            last_modified: meta.modified().map(super::iso8601).unwrap_or_default(),
            e_tag: super::quote_etag(&etag),
        },
    ))
}

/// Writes one part file into the upload's staging directory; repeating a
/// part number overwrites the previous attempt.
async fn upload_part(
    state: &AppState,
    part: &UploadPartParams,
    body: Bytes,
) -> Result<Response, S3Error> {
    let staging = store::resolve(&state.config.mount, store::STAGING_DIR, &part.upload_id)
        .map_err(|e| {
            tracing::error!(error = %e, upload_id = part.upload_id, "Invalid upload id");
            S3Error::internal(StatusCode::BAD_REQUEST, &part.upload_id)
        })?;
    if tokio::fs::metadata(&staging).await.is_err() {
        tracing::warn!(upload_id = part.upload_id, "Unknown multipart upload");
        return Err(S3Error::internal(StatusCode::BAD_REQUEST, &part.upload_id));
    }

    let path = staging.join(part.part_number.to_string());
    let etag = hex::encode(Md5::digest(&body));
    tokio::fs::write(&path, &body).await.map_err(|e| {
        tracing::error!(error = %e, upload_id = part.upload_id, "Failed to write part");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &part.upload_id)
    })?;
    store::set_object_etag(&path, &etag).map_err(|e| {
        tracing::error!(error = %e, upload_id = part.upload_id, "Failed to set etag attribute");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &part.upload_id)
    })?;

    tracing::debug!(
        upload_id = part.upload_id,
        part_number = part.part_number,
        etag,
        "Stored upload part"
    );
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, 0)
        .header(header::ETAG, super::quote_etag(&etag))
        .body(Body::empty())
        .unwrap_or_default())
}

fn empty_ok() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, 0)
        .body(Body::empty())
        .unwrap_or_default()
}
