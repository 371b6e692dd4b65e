//! Login dialog helpers: PKCE, the authorization URL and the loopback
//! listener that receives the browser redirect.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Local OAuth callback path (port is configurable or random).
pub const LOCAL_CALLBACK_PATH: &str = "/callback";

/// PKCE code verifier and challenge
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

/// Generate PKCE code verifier and challenge
pub fn generate_pkce() -> Pkce {
    // Two v4 UUIDs give 32 random bytes.
    let uuid1 = uuid::Uuid::new_v4();
    let uuid2 = uuid::Uuid::new_v4();
    let mut verifier_bytes = [0u8; 32];
    verifier_bytes[..16].copy_from_slice(uuid1.as_bytes());
    verifier_bytes[16..].copy_from_slice(uuid2.as_bytes());
    let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

    Pkce {
        verifier,
        challenge,
    }
}

/// Inputs of the login dialog URL.
pub struct AuthRequest<'a> {
    pub dialog_base_url: &'a str,
    pub api_version: &'a str,
    pub app_id: &'a str,
    pub redirect_uri: &'a str,
    pub state: &'a str,
    pub scopes: &'a [&'a str],
}

/// Build the login dialog URL.
pub fn build_auth_url(request: &AuthRequest<'_>, pkce: &Pkce) -> String {
    let scope = request.scopes.join(",");
    let params = [
        ("client_id", request.app_id),
        ("redirect_uri", request.redirect_uri),
        ("state", request.state),
        ("scope", scope.as_str()),
        ("response_type", "code"),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", "S256"),
    ];

    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    format!(
        "{}/{}/dialog/oauth?{query}",
        request.dialog_base_url, request.api_version
    )
}

/// Builds the redirect URI for a given localhost port.
pub fn build_redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}{LOCAL_CALLBACK_PATH}")
}

/// Generates a random high localhost port for OAuth callbacks.
pub fn random_local_port() -> u16 {
    let id = uuid::Uuid::new_v4();
    let bytes = id.as_bytes();
    let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
    49152 + (raw % 16384)
}

/// What the login dialog redirected back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthCallback {
    Code(String),
    /// The user declined (`error=access_denied`) or the dialog failed.
    Denied { error: String, reason: Option<String> },
}

/// Binds the callback listener on 127.0.0.1. An unset port picks a random
/// high one.
///
/// # Errors
/// Returns an error if the port cannot be bound.
pub async fn bind_callback(port: Option<u16>) -> Result<(TcpListener, u16)> {
    let port = port.unwrap_or_else(random_local_port);
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("Failed to listen for the login redirect on port {port}"))?;
    let port = listener.local_addr().context("Failed to read callback address")?.port();
    Ok((listener, port))
}

/// Waits until the browser delivers a redirect carrying `expected_state`.
///
/// Unrelated requests (favicons, stale tabs with another state) are answered
/// and ignored. Callers apply their own timeout.
///
/// # Errors
/// Returns an error if accepting a connection fails.
pub async fn wait_for_callback(listener: &TcpListener, expected_state: &str) -> Result<OAuthCallback> {
    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept login redirect")?;

        let mut buffer = [0u8; 8192];
        let read = match stream.read(&mut buffer).await {
            Ok(read) => read,
            Err(err) => {
                tracing::debug!(%peer, error = %err, "dropping unreadable callback connection");
                continue;
            }
        };
        let request = String::from_utf8_lossy(&buffer[..read]);
        let callback = parse_callback_request(&request, expected_state);

        let response = match &callback {
            Some(OAuthCallback::Code(_)) => oauth_success_response(),
            Some(OAuthCallback::Denied { .. }) => oauth_denied_response(),
            None => oauth_error_response(),
        };
        if let Err(err) = stream.write_all(response.as_bytes()).await {
            tracing::debug!(%peer, error = %err, "failed to answer callback request");
        }
        let _ = stream.shutdown().await;

        match callback {
            Some(callback) => return Ok(callback),
            None => tracing::debug!(%peer, "ignoring unrelated request on callback port"),
        }
    }
}

/// Extracts the callback from a raw HTTP request, if it is one for `expected_state`.
pub fn parse_callback_request(request: &str, expected_state: &str) -> Option<OAuthCallback> {
    let mut lines = request.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    let path = parts.next()?;

    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    if url.path() != LOCAL_CALLBACK_PATH {
        return None;
    }
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
    };

    if param("state")? != expected_state {
        return None;
    }
    if let Some(code) = param("code").filter(|c| !c.is_empty()) {
        return Some(OAuthCallback::Code(code));
    }
    let error = param("error")?;
    let reason = param("error_reason").or_else(|| param("error_description"));
    Some(OAuthCallback::Denied { error, reason })
}

fn html_response(status: &str, message: &str) -> String {
    let body = format!(
        "<!doctype html><html><head><meta charset=\"utf-8\" /><title>fbdeck</title></head><body><p>{message}</p></body></html>"
    );
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn oauth_success_response() -> String {
    html_response(
        "200 OK",
        "Authentication successful. Return to your terminal to continue.",
    )
}

fn oauth_denied_response() -> String {
    html_response(
        "200 OK",
        "Login was cancelled. Return to your terminal to continue.",
    )
}

fn oauth_error_response() -> String {
    html_response("400 Bad Request", "Invalid OAuth callback")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> String {
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n")
    }

    #[test]
    fn test_pkce_challenge_is_sha256_of_verifier() {
        let pkce = generate_pkce();
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(pkce.verifier.as_bytes()));
        assert_eq!(pkce.challenge, expected);
        assert_eq!(pkce.verifier.len(), 43);
    }

    #[test]
    fn test_build_auth_url_contains_dialog_params() {
        let pkce = generate_pkce();
        let url = build_auth_url(
            &AuthRequest {
                dialog_base_url: "https://www.facebook.com",
                api_version: "v18.0",
                app_id: "1234567890",
                redirect_uri: "http://localhost:53682/callback",
                state: "st4te",
                scopes: &["public_profile", "user_posts"],
            },
            &pkce,
        );

        let parsed = url::Url::parse(&url).unwrap();
        assert_eq!(parsed.path(), "/v18.0/dialog/oauth");
        let query: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(query["client_id"], "1234567890");
        assert_eq!(query["scope"], "public_profile,user_posts");
        assert_eq!(query["redirect_uri"], "http://localhost:53682/callback");
        assert_eq!(query["code_challenge"], pkce.challenge);
        assert_eq!(query["response_type"], "code");
    }

    #[test]
    fn test_random_local_port_is_high() {
        for _ in 0..32 {
            assert!(random_local_port() >= 49152);
        }
    }

    #[test]
    fn test_parse_callback_with_code() {
        let request = get("/callback?code=AQD1x&state=abc");
        assert_eq!(
            parse_callback_request(&request, "abc"),
            Some(OAuthCallback::Code("AQD1x".to_string()))
        );
    }

    #[test]
    fn test_parse_callback_denied() {
        let request = get(
            "/callback?error=access_denied&error_code=200&error_description=Permissions+error&error_reason=user_denied&state=abc",
        );
        assert_eq!(
            parse_callback_request(&request, "abc"),
            Some(OAuthCallback::Denied {
                error: "access_denied".to_string(),
                reason: Some("user_denied".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_callback_ignores_foreign_requests() {
        assert_eq!(parse_callback_request(&get("/favicon.ico"), "abc"), None);
        assert_eq!(
            parse_callback_request(&get("/callback?code=x&state=other"), "abc"),
            None
        );
        assert_eq!(parse_callback_request(&get("/callback?state=abc"), "abc"), None);
        assert_eq!(parse_callback_request("", "abc"), None);
    }
}
