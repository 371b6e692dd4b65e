//! Error types surfaced by the session store.
//!
//! Every failure path of the store resolves to one [`SessionError`] variant;
//! presentation (toasts, retries) is left to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error payload reported by the external platform.
///
/// `payload` keeps the body exactly as received so callers can inspect fields
/// the typed accessors do not cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    /// Graph error `type` (e.g. `OAuthException`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ApiError {
    /// Builds an error from a Graph `error` object, keeping it verbatim.
    pub fn from_payload(payload: serde_json::Value) -> Self {
        let message = payload
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        let kind = payload
            .get("type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        let code = payload.get("code").and_then(serde_json::Value::as_i64);
        Self {
            message,
            kind,
            code,
            payload,
        }
    }

    /// Builds an error for a response that carried neither data nor an error.
    pub fn empty_response(what: &str) -> Self {
        Self::local("EmptyResponse", format!("Failed to fetch {what}"))
    }

    /// Builds an error for data that could not be decoded.
    pub fn malformed(what: &str, err: &serde_json::Error) -> Self {
        Self::local("MalformedResponse", format!("Malformed {what}: {err}"))
    }

    /// Builds an error for a request that never produced a response body.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::local("TransportError", message.into())
    }

    fn local(kind: &str, message: String) -> Self {
        let payload = serde_json::json!({ "message": message, "type": kind });
        Self {
            message,
            kind: Some(kind.to_string()),
            code: None,
            payload,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, self.code) {
            (Some(kind), Some(code)) => write!(f, "{} ({kind}, code {code})", self.message),
            (Some(kind), None) => write!(f, "{} ({kind})", self.message),
            (None, Some(code)) => write!(f, "{} (code {code})", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Failures of the SDK bootstrap and the session store operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// The SDK could not be loaded or initialized. Calling `initialize` again retries.
    #[error("Failed to load SDK: {0}")]
    SdkLoadFailed(String),

    /// The user declined or cancelled the interactive login flow.
    #[error("{}", cancelled_message(.0.as_deref()))]
    LoginCancelled(Option<String>),

    /// Another `login()` call is still pending on this store.
    #[error("A login is already in progress")]
    LoginInProgress,

    /// The token was granted but the profile read failed; the token was discarded.
    #[error("Failed to fetch user profile: {0}")]
    ProfileFetchFailed(ApiError),

    /// The operation requires an authenticated session.
    #[error("User is not authenticated")]
    NotAuthenticated,

    /// The posts read failed; carries the platform error as received.
    #[error("Failed to fetch posts: {0}")]
    FetchFailed(ApiError),
}

fn cancelled_message(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("User cancelled login or did not fully authorize: {reason}"),
        None => "User cancelled login or did not fully authorize".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_payload_keeps_body_verbatim() {
        let body = serde_json::json!({
            "message": "Error validating access token: Session has expired",
            "type": "OAuthException",
            "code": 190,
            "error_subcode": 463,
            "fbtrace_id": "AbC123"
        });

        let err = ApiError::from_payload(body.clone());

        assert_eq!(err.kind.as_deref(), Some("OAuthException"));
        assert_eq!(err.code, Some(190));
        assert_eq!(err.payload, body);
        assert!(err.to_string().contains("code 190"));
    }

    #[test]
    fn test_from_payload_without_message() {
        let err = ApiError::from_payload(serde_json::json!({}));
        assert_eq!(err.message, "Unknown error");
        assert_eq!(err.to_string(), "Unknown error");
    }

    #[test]
    fn test_cancelled_message_includes_reason() {
        let err = SessionError::LoginCancelled(Some("access_denied".to_string()));
        assert_eq!(
            err.to_string(),
            "User cancelled login or did not fully authorize: access_denied"
        );
        assert_eq!(
            SessionError::LoginCancelled(None).to_string(),
            "User cancelled login or did not fully authorize"
        );
    }
}
