use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use itertools::Itertools;

use crate::AppState;
use crate::store;

use super::S3Error;
use super::response::{self, BucketEntry, Buckets, ListAllMyBucketsResult, Owner};

#[axum::debug_handler]
/// Implements `ListBuckets`: every directory directly under the mount
/// root, except the multipart staging area.
pub async fn list_buckets(State(state): State<AppState>) -> Result<Response, S3Error> {
    let mut entries = tokio::fs::read_dir(&state.config.mount).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read mount root");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, "")
    })?;

    let mut buckets = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(file_type) = entry.file_type().await else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !file_type.is_dir() || name == store::STAGING_DIR {
            continue;
        }

        let creation_date = entry
            .metadata()
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(super::iso8601)
            .unwrap_or_default();
        buckets.push(BucketEntry {
            name,
            creation_date,
        });
    }

    let buckets = buckets
        .into_iter()
        .sorted_by(|a, b| a.name.cmp(&b.name))
        .collect();

    Ok(response::xml(
        StatusCode::OK,
        "ListAllMyBucketsResult",
        &ListAllMyBucketsResult {
            xmlns: response::XMLNS,
            buckets: Buckets { bucket: buckets },
            owner: Owner::stub(),
        },
    ))
}
