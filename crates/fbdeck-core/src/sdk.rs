//! The adapter seam between the session store and the external platform SDK.
//!
//! [`SocialSdk`] is the only boundary mocked in store tests. The production
//! implementation is [`crate::graph::GraphSdk`].

use async_trait::async_trait;

use crate::error::ApiError;

/// Outcome reported by the interactive login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginStatus {
    /// The user granted access.
    Connected,
    /// The user is signed in to the platform but declined the app.
    NotAuthorized,
    /// The flow was closed, timed out or failed before any decision.
    #[default]
    Unknown,
}

/// Grant returned by a successful interactive login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub access_token: String,
    pub user_id: Option<String>,
    pub expires_in: Option<u64>,
    pub granted_scopes: Vec<String>,
}

/// Result of [`SocialSdk::login`]. A missing `auth_response` means no grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginResponse {
    pub status: LoginStatus,
    pub auth_response: Option<AuthResponse>,
    /// Why no grant was obtained, when the flow reported it.
    pub error_reason: Option<String>,
}

impl LoginResponse {
    pub fn connected(auth_response: AuthResponse) -> Self {
        Self {
            status: LoginStatus::Connected,
            auth_response: Some(auth_response),
            error_reason: None,
        }
    }

    pub fn denied(status: LoginStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            auth_response: None,
            error_reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Result of [`SocialSdk::api`]: `data`, `error`, both absent, never both present
/// in practice (the store treats `error` as authoritative).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub data: Option<serde_json::Value>,
    pub error: Option<ApiError>,
}

impl ApiResponse {
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }
}

/// Failure of a fire-and-forget SDK call (currently only logout).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SdkError(pub String);

/// Callback-free view of the platform SDK.
#[async_trait]
pub trait SocialSdk: Send + Sync {
    /// Runs the interactive login flow requesting `scopes`.
    async fn login(&self, scopes: &[&str]) -> LoginResponse;

    /// Generic Graph call used for both the profile and the posts reads.
    async fn api(&self, path: &str, method: HttpMethod, params: &[(&str, String)]) -> ApiResponse;

    /// Ends the platform session.
    async fn logout(&self) -> Result<(), SdkError>;

    /// Forgets a token granted by [`SocialSdk::login`] that the caller did
    /// not keep. Local only; nothing is sent to the platform.
    fn discard_grant(&self, _access_token: &str) {}
}
