/// Message substituted when a non-success response body cannot be parsed.
pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Errors returned by `RagClient` operations and by `QueryStream` pulls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The backend could not be reached, or the response body could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with a success status but the body did not have
    /// the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
    /// The backend answered with a non-success HTTP status.
    #[error("api error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        detail: Option<String>,
    },
    /// A recognized stream frame carried a payload that could not be decoded.
    ///
    /// Fatal to the stream it occurred in.
    #[error("malformed stream frame: {0}")]
    MalformedFrame(String),
    /// The backend reported success but provided no readable body to stream.
    #[error("streaming response has no body")]
    MissingBody,
    /// The stream ended before a `done` or `error` frame arrived.
    #[error("stream ended before a terminal event")]
    IncompleteStream,
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input, rejected before any request is sent.
    #[error("validation error: {0}")]
    Validation(String),
    /// A local file could not be read.
    #[error("io error: {0}")]
    Io(String),
}

impl ClientError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an API error from its parts.
    pub fn api(status: u16, message: impl Into<String>, detail: Option<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            detail,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns the HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the backend-supplied detail for API errors.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        ClientError::Transport(value.to_string())
    }
}

/// Error document returned by the backend on non-success responses.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Classifies a non-success response body into `ClientError::Api`.
///
/// Bodies that are not a valid `ApiErrorBody` fall back to
/// [`FALLBACK_ERROR_MESSAGE`].
pub(crate) fn api_error_from_body(status: u16, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) => ClientError::api(status, parsed.error, parsed.detail),
        Err(_) => ClientError::api(status, FALLBACK_ERROR_MESSAGE, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_error_and_detail() {
        let err = api_error_from_body(
            404,
            br#"{"error":"Document not found","detail":"no document abc"}"#,
        );
        assert_eq!(
            err,
            ClientError::Api {
                status: 404,
                message: "Document not found".into(),
                detail: Some("no document abc".into()),
            }
        );
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.detail(), Some("no document abc"));
    }

    #[test]
    fn unparsable_body_uses_fallback_message() {
        let err = api_error_from_body(502, b"<html>Bad Gateway</html>");
        assert!(matches!(
            err,
            ClientError::Api { status: 502, ref message, detail: None } if message == FALLBACK_ERROR_MESSAGE
        ));
    }

    #[test]
    fn body_without_error_field_uses_fallback_message() {
        let err = api_error_from_body(500, br#"{"detail":"boom"}"#);
        assert!(matches!(
            err,
            ClientError::Api { ref message, .. } if message == FALLBACK_ERROR_MESSAGE
        ));
    }
}
