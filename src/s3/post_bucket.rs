use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use bytes::{Buf, Bytes};
use serde::Deserialize;
use tracing::Instrument;

use crate::AppState;

use super::S3Error;
use super::delete_object::remove_object;
use super::response::{self, DeleteErrorEntry, DeleteObjectsResponse, DeletedEntry};

mod delete_payloads {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Eq, PartialEq, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct DeletePayload {
        #[serde(default)]
        pub object: Vec<ObjectIdent>,
        #[serde(default)]
        pub quiet: bool,
    }

    #[derive(Serialize, Deserialize, Eq, PartialEq, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct ObjectIdent {
        pub key: String,
    }
}

#[derive(Deserialize)]
pub struct PostBucketParams {
    delete: Option<String>,
}

#[axum::debug_handler]
/// Implements the bulk `DeleteObjects` operation. Keys are processed
/// independently; a missing key is reported in the `Error` list without
/// aborting the batch.
pub async fn modify_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Query(params): Query<PostBucketParams>,
    body: Bytes,
) -> Result<Response, S3Error> {
    if params.delete.is_none() {
        return Err(S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &bucket));
    }

    let payload: delete_payloads::DeletePayload = quick_xml::de::from_reader(body.reader())
        .map_err(|e| {
            tracing::error!(error = %e, bucket, "Failed to parse Delete payload");
            S3Error::internal(StatusCode::INTERNAL_SERVER_ERROR, &bucket)
        })?;

    let mut deleted = Vec::with_capacity(payload.object.len());
    let mut errors = Vec::new();
    for entry in payload.object {
        let result = remove_object(&state, &bucket, &entry.key)
            .instrument(tracing::debug_span!(
                "DeleteObjects entry",
                bucket,
                key = entry.key,
            ))
            .await;

        match result {
            Ok(()) => deleted.push(DeletedEntry { key: entry.key }),
            Err(e) => {
                tracing::warn!(error = %e, key = entry.key, "Failed to delete object");
                errors.push(DeleteErrorEntry {
                    code: "NoSuchKey".to_string(),
                    message: "NoSuchKey".to_string(),
                    key: entry.key,
                });
            }
        }
    }

    Ok(response::xml(
        StatusCode::OK,
        "DeleteObjectsResponse",
        &DeleteObjectsResponse { deleted, errors },
    ))
}

#[cfg(test)]
mod tests {
    use super::delete_payloads::{DeletePayload, ObjectIdent};
    use crate::s3::response::{DeleteErrorEntry, DeleteObjectsResponse, DeletedEntry};

    #[test]
    fn parses_delete_request() {
        let payload = r"<Delete>
<Object>
<Key>sample1.txt</Key>
</Object>
<Object>
<Key>sample2.txt</Key>
</Object>
</Delete>";

        let expected = DeletePayload {
            object: vec![
                ObjectIdent {
                    key: "sample1.txt".to_string(),
                },
                ObjectIdent {
                    key: "sample2.txt".to_string(),
                },
            ],
            quiet: false,
        };
        assert_eq!(
            quick_xml::de::from_str::<DeletePayload>(payload).unwrap(),
            expected
        );
    }

    #[test]
    fn parses_quiet_flag_and_missing_objects() {
        let payload = "<Delete><Quiet>true</Quiet></Delete>";
        let parsed = quick_xml::de::from_str::<DeletePayload>(payload).unwrap();
        assert!(parsed.quiet);
        assert!(parsed.object.is_empty());
    }

    #[test]
    fn encodes_mixed_response() {
        let payload = DeleteObjectsResponse {
            deleted: vec![DeletedEntry {
                key: "sample1.txt".to_string(),
            }],
            errors: vec![DeleteErrorEntry {
                code: "NoSuchKey".to_string(),
                message: "NoSuchKey".to_string(),
                key: "sample3.txt".to_string(),
            }],
        };

        let expected = "<DeleteObjectsResponse>\
            <Deleted><Key>sample1.txt</Key></Deleted>\
            <Error><Code>NoSuchKey</Code><Message>NoSuchKey</Message><Key>sample3.txt</Key></Error>\
            </DeleteObjectsResponse>";

        assert_eq!(
            quick_xml::se::to_string_with_root("DeleteObjectsResponse", &payload).unwrap(),
            expected
        );
    }
}
