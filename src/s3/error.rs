use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::response::{self, ErrorEnvelope};

/// Wire-level S3 error: an HTTP status plus the XML `Error` envelope.
///
/// Handlers return `Result<Response, S3Error>` and let the error render
/// itself, so the envelope shape lives in exactly one place.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {resource}")]
pub struct S3Error {
    status: StatusCode,
    code: &'static str,
    resource: String,
}

impl S3Error {
    fn new(status: StatusCode, code: &'static str, resource: impl Into<String>) -> Self {
        S3Error {
            status,
            code,
            resource: resource.into(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed", "")
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UnauthorizedAccess", "")
    }

    pub fn no_such_bucket(status: StatusCode, bucket: &str) -> Self {
        Self::new(status, "NoSuchBucket", bucket)
    }

    pub fn no_such_key(status: StatusCode, key: &str) -> Self {
        Self::new(status, "NoSuchKey", key)
    }

    pub fn bucket_already_owned(bucket: &str) -> Self {
        Self::new(StatusCode::CONFLICT, "BucketAlreadyOwnedByYou", bucket)
    }

    pub fn bucket_not_empty(bucket: &str) -> Self {
        Self::new(StatusCode::CONFLICT, "BucketNotEmpty", bucket)
    }

    /// Catch-all for I/O, parse, and xattr failures.
    pub fn internal(status: StatusCode, resource: impl Into<String>) -> Self {
        Self::new(status, "InternalError", resource)
    }
}

impl IntoResponse for S3Error {
    fn into_response(self) -> Response {
        response::xml(
            self.status,
            "Error",
            &ErrorEnvelope {
                code: self.code.to_string(),
                message: self.code.to_string(),
                resource: self.resource,
                request_id: String::new(),
            },
        )
    }
}
