use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::transport::ResponseBody;

/// Result alias used across the crate.
pub type ProtectKitResult<T, E = ProtectKitError> = std::result::Result<T, E>;

/// Error outputs from `ProtectKit`.
///
/// Every failure, local or remote, ends up as exactly one of these variants and its
/// `Display` output is the single message callers should surface.
#[derive(Debug, Error)]
pub enum ProtectKitError {
    /// No response was received. Carries the underlying fault's message unchanged.
    #[error("{0}")]
    Transport(String),
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Server {
        /// HTTP status code of the response.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },
    /// The server answered successfully but reported an incompatible version.
    #[error("version mismatch: expected server version {expected}, received {actual}")]
    VersionMismatch {
        /// Version line this client was built for.
        expected: String,
        /// Version reported by the server, or `missing`.
        actual: String,
    },
    /// The presented input is not valid for the requested operation.
    #[error("invalid_input: {0}")]
    InvalidInput(String),
    /// A payload could not be serialized, or a response did not match its wire shape.
    #[error("serialization_error: {0}")]
    SerializationError(String),
    /// The connection configuration is unusable.
    #[error("configuration_error: {0}")]
    Config(String),
}

impl ProtectKitError {
    /// HTTP status of a server-reported error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProtectKitError {
    fn from(error: reqwest::Error) -> Self {
        Self::Config(error.to_string())
    }
}

/// Turns a non-2xx response into a [`ProtectKitError::Server`].
///
/// A structured body contributes its `error` field; a raw body is used as-is.
pub(crate) fn normalize(status: StatusCode, body: ResponseBody) -> ProtectKitError {
    let message = match body {
        ResponseBody::Json(Value::Object(mut fields)) if fields.contains_key("error") => {
            match fields.remove("error") {
                Some(Value::String(message)) => message,
                Some(other) => other.to_string(),
                None => String::new(),
            }
        }
        ResponseBody::Json(Value::String(text)) | ResponseBody::Text(text) => text,
        ResponseBody::Json(other) => other.to_string(),
        ResponseBody::Empty => format!("request failed with status {}", status.as_u16()),
    };

    ProtectKitError::Server {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_error_field_is_the_message() {
        let err = normalize(
            StatusCode::BAD_REQUEST,
            ResponseBody::Json(json!({"error": "vault not found", "code": 12})),
        );
        assert_eq!(err.to_string(), "vault not found");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_non_string_error_field_is_rendered_as_json() {
        let err = normalize(
            StatusCode::CONFLICT,
            ResponseBody::Json(json!({"error": {"reason": "locked"}})),
        );
        assert_eq!(err.to_string(), r#"{"reason":"locked"}"#);
    }

    #[test]
    fn test_raw_body_is_the_message() {
        let err = normalize(
            StatusCode::BAD_GATEWAY,
            ResponseBody::Text("upstream exploded".to_string()),
        );
        assert_eq!(err.to_string(), "upstream exploded");
    }

    #[test]
    fn test_json_string_body_is_the_message() {
        let err = normalize(
            StatusCode::FORBIDDEN,
            ResponseBody::Json(Value::String("denied".to_string())),
        );
        assert_eq!(err.to_string(), "denied");
    }

    #[test]
    fn test_structured_body_without_error_field() {
        let err = normalize(
            StatusCode::UNPROCESSABLE_ENTITY,
            ResponseBody::Json(json!({"detail": "bad ttl"})),
        );
        assert_eq!(err.to_string(), r#"{"detail":"bad ttl"}"#);
    }

    #[test]
    fn test_empty_body_reports_status() {
        let err = normalize(StatusCode::SERVICE_UNAVAILABLE, ResponseBody::Empty);
        assert_eq!(err.to_string(), "request failed with status 503");
    }

    #[test]
    fn test_version_mismatch_names_both_versions() {
        let err = ProtectKitError::VersionMismatch {
            expected: "v0.2".to_string(),
            actual: "v1.4.0".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("v0.2"));
        assert!(message.contains("v1.4.0"));
        assert_eq!(err.status(), None);
    }
}
