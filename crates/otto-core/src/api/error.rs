use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    RequestFailed(String),

    #[error("Unable to reach the server. Check your connection.")]
    NetworkUnavailable,

    #[error("Session is no longer valid")]
    InvalidSession,

    #[error("Admin access required")]
    AccessRequired,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Superseded by a newer session change")]
    Superseded,

    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in log messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Build a `RequestFailed` from a non-success response.
    ///
    /// The backend reports failures as `{"message": ...}` (login) or
    /// `{"error": ...}` (everything else). When neither is present the
    /// status reason phrase is used.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        ApiError::RequestFailed(Self::message_from_body(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
        }))
    }

    fn message_from_body(body: &str) -> Option<String> {
        let value: Value = serde_json::from_str(body).ok()?;
        ["message", "error"].iter().find_map(|key| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        })
    }

    /// Classify a transport error. Anything that produced no HTTP response
    /// is reported as the network being unavailable.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::NetworkUnavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_uses_message_field() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"message":"Invalid credentials"}"#,
        );
        assert_eq!(err, ApiError::RequestFailed("Invalid credentials".to_string()));
    }

    #[test]
    fn test_from_status_uses_error_field() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"error":"Invalid year parameter"}"#);
        assert_eq!(err, ApiError::RequestFailed("Invalid year parameter".to_string()));
    }

    #[test]
    fn test_from_status_falls_back_to_reason() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>upstream down</html>");
        assert_eq!(err, ApiError::RequestFailed("Bad Gateway".to_string()));

        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":""}"#);
        assert_eq!(err, ApiError::RequestFailed("Internal Server Error".to_string()));
    }

    #[test]
    fn test_from_status_unknown_code() {
        let status = StatusCode::from_u16(599).expect("valid status code");
        let err = ApiError::from_status(status, "");
        assert_eq!(err, ApiError::RequestFailed("Request failed with status 599".to_string()));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(ApiError::truncate_body("short"), "short");

        let long = "x".repeat(600);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let long = "é".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
    }
}
