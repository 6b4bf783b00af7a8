//! Error types for the api.ai client.
//!
//! # Design
//! Four top-level kinds mirror the stages a call goes through: building the
//! configuration, validating operation input, performing the HTTP round trip,
//! and decoding the response. Everything that can go wrong on the wire lands in
//! `RequestError`, which keeps the raw status code and body of non-2xx
//! responses for debugging.

use thiserror::Error;

/// Errors returned by `ClientConfig` construction and `ApiAiClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client configuration is unusable (missing access token).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A required operation argument was empty.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The request could not be built, sent, or was answered with a non-2xx status.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The response body is not JSON of the expected shape.
    #[error("decoding response failed: {0}")]
    Decode(String),
}

/// Failures of the request/response round trip.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The transport could not deliver the request or read the response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serializing request body failed: {0}")]
    Serialization(String),

    /// Base URL and path did not form a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status code of the response, when the error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request(RequestError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
