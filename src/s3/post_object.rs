use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use bytes::{Buf, Bytes};
use md5::{Digest, Md5};
use rand::Rng;
use serde::Deserialize;

use crate::AppState;
use crate::store;

use super::S3Error;
use super::response::{self, InitiateMultipartUploadResponse};

const UPLOAD_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const UPLOAD_ID_LEN: usize = 50;

fn generate_upload_id() -> String {
    let mut rng = rand::rng();
    (0..UPLOAD_ID_LEN)
        .map(|_| UPLOAD_ID_ALPHABET[rng.random_range(0..UPLOAD_ID_ALPHABET.len())] as char)
        .collect()
}

mod complete_payloads {
    use serde::Deserialize;

    #[derive(Deserialize, Eq, PartialEq, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct CompleteMultipartUpload {
        #[serde(default)]
        pub part: Vec<Part>,
    }

    #[derive(Deserialize, Eq, PartialEq, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct Part {
        pub part_number: u16,
        #[serde(default)]
        pub e_tag: Option<String>,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostObjectParams {
    /// Marks the `CreateMultipartUpload` operation
    uploads: Option<String>,
    /// Marks the `CompleteMultipartUpload` operation
    upload_id: Option<String>,
}

#[axum::debug_handler]
/// Handles `CreateMultipartUpload` and `CompleteMultipartUpload`
/// depending on query parameters.
pub async fn multipart_upload(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<PostObjectParams>,
    body: Bytes,
) -> Result<Response, S3Error> {
    if params.uploads.is_some() {
        return initiate_upload(&state, &bucket, &key).await;
    }
    if let Some(upload_id) = params.upload_id {
        return complete_upload(&state, &bucket, &key, &upload_id, body).await;
    }

    Err(S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &key))
}

/// Creates the staging directory for a fresh upload id.
async fn initiate_upload(
    state: &AppState,
    bucket: &str,
    key: &str,
) -> Result<Response, S3Error> {
    let path = store::resolve(&state.config.mount, bucket, key).map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Invalid key value");
        S3Error::internal(StatusCode::BAD_REQUEST, key)
    })?;

    if tokio::fs::metadata(&path).await.is_ok() {
        tracing::warn!(bucket, key, "Target path already exists");
        return Err(S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key));
    }
    if key.ends_with('/') {
        tracing::warn!(bucket, key, "Multipart upload target is a directory");
        return Err(S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key));
    }

    let upload_id = generate_upload_id();
    let staging = store::resolve(&state.config.mount, store::STAGING_DIR, &upload_id)
        .map_err(|e| {
            tracing::error!(error = %e, upload_id, "Invalid upload id");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;
    tokio::fs::create_dir_all(&staging).await.map_err(|e| {
        tracing::error!(error = %e, upload_id, "Failed to create staging directory");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;

    tracing::debug!(bucket, key, upload_id, "Started multipart upload");
    Ok(response::xml(
        StatusCode::OK,
        "InitiateMultipartUploadResponse",
        &InitiateMultipartUploadResponse {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
        },
    ))
}

/// Concatenates the staged parts in the order listed in the request body
/// into the final object, computes the composite ETag, and tears the
/// staging directory down.
///
/// The composite hash ingests each part's raw 16-byte MD5 digest
/// (decoded from the stored hex attribute), matching how AWS derives
/// multipart ETags.
async fn complete_upload(
    state: &AppState,
    bucket: &str,
    key: &str,
    upload_id: &str,
    body: Bytes,
) -> Result<Response, S3Error> {
    let payload: complete_payloads::CompleteMultipartUpload =
        quick_xml::de::from_reader(body.reader()).map_err(|e| {
            tracing::error!(error = %e, upload_id, "Failed to parse CompleteMultipartUpload payload");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;

    let staging = store::resolve(&state.config.mount, store::STAGING_DIR, upload_id)
        .map_err(|e| {
            tracing::error!(error = %e, upload_id, "Invalid upload id");
            S3Error::internal(StatusCode::BAD_REQUEST, upload_id)
        })?;
    if tokio::fs::metadata(&staging).await.is_err() {
        tracing::warn!(upload_id, "Unknown multipart upload");
        return Err(S3Error::internal(StatusCode::BAD_REQUEST, upload_id));
    }

    let path = store::resolve(&state.config.mount, bucket, key).map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Invalid key value");
        S3Error::internal(StatusCode::BAD_REQUEST, key)
    })?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            tracing::error!(error = %e, bucket, key, "Failed to create parent directories");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;
    }
    let mut target = tokio::fs::File::create(&path).await.map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Failed to create target object");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;

    let mut digests = Md5::new();
    for part in &payload.part {
        let part_path = staging.join(part.part_number.to_string());

        let part_etag = store::object_etag(&part_path).map_err(|e| {
            tracing::error!(
                error = %e,
                upload_id,
                part_number = part.part_number,
                "Part is missing its etag attribute"
            );
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;
        let digest = hex::decode(&part_etag).map_err(|e| {
            tracing::error!(error = %e, upload_id, "Part etag is not valid hex");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;
        digests.update(&digest);

        let mut part_file = tokio::fs::File::open(&part_path).await.map_err(|e| {
            tracing::error!(
                error = %e,
                upload_id,
                part_number = part.part_number,
                "Failed to open part"
            );
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;
        tokio::io::copy(&mut part_file, &mut target)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, upload_id, "Failed to append part bytes");
                S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
            })?;
        tokio::fs::remove_file(&part_path).await.map_err(|e| {
            tracing::error!(error = %e, upload_id, "Failed to remove consumed part");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
        })?;
    }

    target.sync_all().await.map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Failed to sync target object");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;
    tokio::fs::remove_dir_all(&staging).await.map_err(|e| {
        tracing::error!(error = %e, upload_id, "Failed to remove staging directory");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;

    let etag = format!("{}-{}", hex::encode(digests.finalize()), payload.part.len());
    store::set_object_etag(&path, &etag).map_err(|e| {
        tracing::error!(error = %e, bucket, key, "Failed to set etag attribute");
        S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, key)
    })?;

    tracing::debug!(bucket, key, upload_id, etag, "Completed multipart upload");
    Ok(response::xml(
        StatusCode::OK,
        "CompleteMultipartUpload",
        &response::CompleteMultipartUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            e_tag: super::quote_etag(&etag),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::complete_payloads::CompleteMultipartUpload;
    use super::*;

    #[test]
    fn upload_ids_are_fifty_letters() {
        let id = generate_upload_id();
        assert_eq!(id.len(), UPLOAD_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn parses_complete_payload_in_listed_order() {
        let payload = r#"<CompleteMultipartUpload>
<Part><PartNumber>2</PartNumber><ETag>"a"</ETag></Part>
<Part><PartNumber>1</PartNumber></Part>
</CompleteMultipartUpload>"#;

        let parsed = quick_xml::de::from_str::<CompleteMultipartUpload>(payload).unwrap();
        let order: Vec<u16> = parsed.part.iter().map(|p| p.part_number).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(parsed.part[0].e_tag.as_deref(), Some("\"a\""));
        assert_eq!(parsed.part[1].e_tag, None);
    }
}
