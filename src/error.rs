//! Error types for the accounting API client.
//!
//! Every failure surfaced by the dispatch pipeline is one variant of
//! [`Error`]. Remote error envelopes are normalised into [`RemoteError`]
//! regardless of which key casing the service used.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A specialized `Result` type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML response body could not be parsed
    #[error("XML error: {0}")]
    Xml(String),

    /// Reading an upload file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A required attribute was absent from the writeable data supplied.
    ///
    /// Carries the full required set of the operation, not only the
    /// missing names.
    #[error("Missing required attribute; required: {}", .required.join(", "))]
    MissingRequiredAttribute {
        /// Every field the operation requires
        required: Vec<String>,
    },

    /// The remote service answered with an error envelope
    #[error("Remote error: status={status}, error={}, message={}, code={:?}", .error.error, .error.message, .error.code)]
    Remote {
        /// Normalised error envelope
        error: RemoteError,
        /// HTTP status code
        status: u16,
        /// Raw response body for debugging
        body: Value,
    },

    /// The response declared a content type the decoder does not handle
    #[error("Unsupported content type: {0:?}")]
    UnsupportedContentType(Option<String>),

    /// Still rate limited after the retry budget was spent
    #[error("Rate limited; gave up after {attempts} retries")]
    RateLimited {
        /// Number of retries performed
        attempts: u32,
    },

    /// The call was cancelled through its cancellation token
    #[error("Request cancelled")]
    Cancelled,

    /// A provider schema violates `writeable ⊆ readable`
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Invalid input provided to a function
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if this error is potentially transient and the
    /// operation could be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } => true,
            Error::Remote { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this error was produced by the remote service.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote { .. })
    }

    /// Returns `true` if this error indicates a client-side issue
    /// (rejected input, bad request, etc.).
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Remote { status, .. } => *status >= 400 && *status < 500,
            Error::MissingRequiredAttribute { .. }
            | Error::InvalidInput(_)
            | Error::InvalidSchema(_)
            | Error::Config(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates a server-side issue.
    pub fn is_server_error(&self) -> bool {
        match self {
            Error::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the normalised remote envelope, if this is a remote error.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Error::Remote { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Create a remote error from a non-success response body.
    pub(crate) fn from_api_response(status: u16, body: Value) -> Self {
        Error::Remote {
            error: RemoteError::from_body(&body),
            status,
            body,
        }
    }
}

/// Error envelope returned by the remote service, normalised from any of
/// its accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Service error identifier
    pub error: String,
    /// Human-readable message
    pub message: String,
    /// Numeric error code, when the service supplied one
    pub code: Option<i64>,
}

impl RemoteError {
    /// Create a new remote error.
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: Option<i64>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code,
        }
    }

    /// Normalise an error body into a [`RemoteError`].
    ///
    /// Shapes are tried in order: `ErrorInformation` with upper-camel keys,
    /// `ErrorInformation` with lower-case keys, the same two shapes without
    /// the wrapper object, and finally a bare `message` which is used as
    /// both the error identifier and the message.
    pub fn from_body(body: &Value) -> Self {
        match ErrorEnvelope::deserialize(body) {
            Ok(ErrorEnvelope::Wrapped { info }) | Ok(ErrorEnvelope::Flat(info)) => info.into(),
            Ok(ErrorEnvelope::Plain { message }) => Self::new(message.clone(), message, None),
            Err(_) => {
                let message = body
                    .as_str()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or("Unknown API error")
                    .to_string();
                Self::new(message.clone(), message, None)
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
    Wrapped {
        #[serde(rename = "ErrorInformation", alias = "errorInformation")]
        info: ErrorInformation,
    },
    Flat(ErrorInformation),
    Plain {
        #[serde(alias = "Message")]
        message: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorInformation {
    Upper {
        #[serde(rename = "Error")]
        error: Scalar,
        #[serde(rename = "Message")]
        message: String,
        #[serde(rename = "Code")]
        code: Option<Scalar>,
    },
    Lower {
        error: Scalar,
        message: String,
        code: Option<Scalar>,
    },
}

impl From<ErrorInformation> for RemoteError {
    fn from(info: ErrorInformation) -> Self {
        let (error, message, code) = match info {
            ErrorInformation::Upper { error, message, code }
            | ErrorInformation::Lower { error, message, code } => (error, message, code),
        };
        RemoteError::new(error.to_string(), message, code.and_then(|c| c.as_i64()))
    }
}

/// Numbers and strings are used interchangeably for error identifiers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_shapes_normalise_identically() {
        let upper = json!({"ErrorInformation": {"Error": "X", "Message": "m", "Code": 7}});
        let lower = json!({"ErrorInformation": {"error": "X", "message": "m", "code": 7}});

        let expected = RemoteError::new("X", "m", Some(7));
        assert_eq!(RemoteError::from_body(&upper), expected);
        assert_eq!(RemoteError::from_body(&lower), expected);
    }

    #[test]
    fn test_numeric_error_identifier() {
        let body = json!({"ErrorInformation": {"error": 1, "message": "Invalid", "code": 2000359}});
        let err = RemoteError::from_body(&body);
        assert_eq!(err.error, "1");
        assert_eq!(err.code, Some(2000359));
    }

    #[test]
    fn test_string_code_is_parsed() {
        let body = json!({"ErrorInformation": {"Error": "E", "Message": "m", "Code": "42"}});
        assert_eq!(RemoteError::from_body(&body).code, Some(42));
    }

    #[test]
    fn test_lowercase_wrapper_key() {
        let body = json!({"errorInformation": {"error": "X", "message": "m", "code": 3}});
        assert_eq!(RemoteError::from_body(&body), RemoteError::new("X", "m", Some(3)));
    }

    #[test]
    fn test_flat_envelope() {
        let body = json!({"Error": "X", "Message": "m", "Code": 9});
        assert_eq!(RemoteError::from_body(&body), RemoteError::new("X", "m", Some(9)));
    }

    #[test]
    fn test_message_fallback() {
        let body = json!({"message": "Unauthorized"});
        let err = RemoteError::from_body(&body);
        assert_eq!(err, RemoteError::new("Unauthorized", "Unauthorized", None));
    }

    #[test]
    fn test_unknown_body_fallback() {
        let err = RemoteError::from_body(&json!({"unexpected": true}));
        assert_eq!(err.message, "Unknown API error");
        assert_eq!(err.code, None);

        let err = RemoteError::from_body(&Value::String("Bad Gateway".into()));
        assert_eq!(err.message, "Bad Gateway");
    }

    #[test]
    fn test_from_api_response() {
        let body = json!({"ErrorInformation": {"error": 1, "message": "Not found", "code": 2000}});
        let err = Error::from_api_response(404, body);
        assert!(err.is_remote());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert_eq!(err.remote().map(|r| r.message.as_str()), Some("Not found"));
    }

    #[test]
    fn test_error_retryable() {
        assert!(Error::RateLimited { attempts: 3 }.is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::MissingRequiredAttribute { required: vec!["Code".into()] }.is_retryable());
        assert!(Error::from_api_response(503, Value::Null).is_retryable());
    }

    #[test]
    fn test_missing_attribute_display() {
        let err = Error::MissingRequiredAttribute {
            required: vec!["Code".into(), "Description".into()],
        };
        assert_eq!(err.to_string(), "Missing required attribute; required: Code, Description");
    }
}
