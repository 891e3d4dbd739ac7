//! XML envelopes for the S3 wire protocol.
//!
//! Element names and ordering follow the AWS response shapes; everything
//! serializes through `quick_xml` with an explicit root element name.

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;
use serde::Serialize;

pub const XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serializes `payload` under `root` into an `application/xml` response.
pub fn xml<T: Serialize>(code: StatusCode, root: &str, payload: &T) -> Response {
    let body = match quick_xml::se::to_string_with_root(root, payload) {
        Ok(out) => format!("{XML_DECL}\n{out}"),
        Err(e) => {
            tracing::error!(error = %e, root, "Failed to serialize XML response");
            String::new()
        }
    };

    Response::builder()
        .status(code)
        .header(header::CONTENT_TYPE, "application/xml")
        .body(Body::from(body))
        .unwrap_or_default()
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub resource: String,
    pub request_id: String,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Owner {
    #[serde(rename = "ID")]
    pub id: String,
    pub display_name: String,
}

impl Owner {
    /// There is a single implicit owner; identity management is not part
    /// of this service.
    pub fn stub() -> Self {
        Owner {
            id: "id".to_string(),
            display_name: "name".to_string(),
        }
    }
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ListAllMyBucketsResult {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'static str,
    pub buckets: Buckets,
    pub owner: Owner,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
pub struct Buckets {
    #[serde(rename = "Bucket")]
    pub bucket: Vec<BucketEntry>,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct BucketEntry {
    pub name: String,
    pub creation_date: String,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ListBucketResult {
    pub name: String,
    pub prefix: String,
    pub key_count: usize,
    pub max_keys: usize,
    pub is_truncated: bool,
    pub contents: Vec<ObjectEntry>,
    pub common_prefixes: Vec<CommonPrefix>,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectEntry {
    pub key: String,
    pub last_modified: String,
    pub e_tag: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    pub storage_class: String,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct CommonPrefix {
    pub prefix: String,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct VersioningConfiguration {
    pub status: String,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct CopyObjectResult {
    pub last_modified: String,
    pub e_tag: String,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ListVersionsResult {
    pub name: String,
    pub prefix: String,
    pub key_marker: String,
    pub next_version_id_marker: String,
    pub version_id_marker: String,
    pub max_keys: usize,
    pub is_truncated: bool,
    pub version: Vec<ObjectVersionEntry>,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectVersionEntry {
    pub key: String,
    pub last_modified: String,
    pub e_tag: String,
    pub size: u64,
    pub owner: Owner,
    pub storage_class: String,
    pub is_latest: bool,
    pub version_id: String,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
pub struct DeleteObjectsResponse {
    #[serde(rename = "Deleted")]
    pub deleted: Vec<DeletedEntry>,
    #[serde(rename = "Error")]
    pub errors: Vec<DeleteErrorEntry>,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct DeletedEntry {
    pub key: String,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteErrorEntry {
    pub code: String,
    pub message: String,
    pub key: String,
}

#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateMultipartUploadResponse {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

/// Response envelope for a completed multipart upload. The root element
/// is `CompleteMultipartUpload` on this wire protocol.
#[derive(Serialize, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct CompleteMultipartUpload {
    pub bucket: String,
    pub key: String,
    pub e_tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_error_envelope() {
        let payload = ErrorEnvelope {
            code: "NoSuchKey".to_string(),
            message: "NoSuchKey".to_string(),
            resource: "a.txt".to_string(),
            request_id: String::new(),
        };

        assert_eq!(
            quick_xml::se::to_string_with_root("Error", &payload).unwrap(),
            "<Error><Code>NoSuchKey</Code><Message>NoSuchKey</Message>\
             <Resource>a.txt</Resource><RequestId/></Error>"
        );
    }

    #[test]
    fn encodes_bucket_list_with_namespace() {
        let payload = ListAllMyBucketsResult {
            xmlns: XMLNS,
            buckets: Buckets {
                bucket: vec![BucketEntry {
                    name: "docs".to_string(),
                    creation_date: "2024-01-01T00:00:00.000Z".to_string(),
                }],
            },
            owner: Owner::stub(),
        };

        let out = quick_xml::se::to_string_with_root("ListAllMyBucketsResult", &payload).unwrap();
        assert!(out.starts_with(
            r#"<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#
        ));
        assert!(out.contains("<Buckets><Bucket><Name>docs</Name>"));
        assert!(out.contains("<Owner><ID>id</ID><DisplayName>name</DisplayName></Owner>"));
    }

    #[test]
    fn encodes_listing_without_contents_as_empty() {
        let payload = ListBucketResult {
            name: "docs".to_string(),
            prefix: String::new(),
            key_count: 0,
            max_keys: 1000,
            is_truncated: false,
            contents: vec![],
            common_prefixes: vec![],
        };

        let out = quick_xml::se::to_string_with_root("ListBucketResult", &payload).unwrap();
        assert!(out.contains("<KeyCount>0</KeyCount>"));
        assert!(out.contains("<IsTruncated>false</IsTruncated>"));
        assert!(!out.contains("<Contents>"));
    }

    #[test]
    fn etag_fields_serialize_with_aws_casing() {
        let payload = CopyObjectResult {
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            e_tag: "\"d41d8cd98f00b204e9800998ecf8427e\"".to_string(),
        };

        let out = quick_xml::se::to_string_with_root("CopyObjectResult", &payload).unwrap();
        assert!(out.contains("<ETag>"));
    }
}
