//! Graph API implementation of [`SocialSdk`].
//!
//! Login runs the platform's OAuth dialog in the system browser and waits for
//! the redirect on a loopback port; the code is exchanged (with PKCE) for an
//! access token that stays in memory only.

pub mod oauth;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::bootstrap::{SdkLoader, SdkSettings};
use crate::error::ApiError;
use crate::models::AccessToken;
use crate::sdk::{
    ApiResponse, AuthResponse, HttpMethod, LoginResponse, LoginStatus, SdkError, SocialSdk,
};

/// Receives the login dialog URL; shows it to the user and/or opens a browser.
pub type UrlPresenter = Arc<dyn Fn(&str) + Send + Sync>;

/// Transport options resolved from config and environment.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub graph_base_url: String,
    pub dialog_base_url: String,
    pub app_secret: Option<String>,
    pub callback_port: Option<u16>,
    pub login_timeout: Duration,
    pub revoke_on_logout: bool,
    pub open_browser: bool,
}

/// Opens `url` in the default browser, best effort.
pub fn open_in_browser(url: &str) {
    if let Err(err) = open::that(url) {
        tracing::warn!(error = %err, "could not open browser");
    }
}

/// Builds [`GraphSdk`] instances; the bootstrap calls it once.
pub struct GraphLoader {
    options: GraphOptions,
    presenter: UrlPresenter,
}

impl GraphLoader {
    pub fn new(options: GraphOptions, presenter: UrlPresenter) -> Self {
        Self { options, presenter }
    }
}

#[async_trait]
impl SdkLoader for GraphLoader {
    async fn load(&self, settings: &SdkSettings) -> Result<Arc<dyn SocialSdk>> {
        validate_settings(settings)?;

        let http = reqwest::Client::builder()
            .cookie_store(settings.cookie)
            .user_agent(concat!("fbdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Arc::new(GraphSdk {
            settings: settings.clone(),
            options: self.options.clone(),
            http,
            token: Mutex::new(None),
            presenter: Arc::clone(&self.presenter),
        }))
    }
}

fn validate_settings(settings: &SdkSettings) -> Result<()> {
    let app_id = settings.app_id.trim();
    if app_id.is_empty() {
        anyhow::bail!("Missing Facebook App ID. Set app_id in config.toml or FBDECK_APP_ID.");
    }
    if !app_id.chars().all(|c| c.is_ascii_digit()) {
        anyhow::bail!("Invalid Facebook App ID '{app_id}': expected digits only");
    }
    let version = settings.api_version.as_str();
    let valid_version = version
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == '.'));
    if !valid_version {
        anyhow::bail!("Invalid Graph API version '{version}': expected e.g. v18.0");
    }
    Ok(())
}

pub struct GraphSdk {
    settings: SdkSettings,
    options: GraphOptions,
    http: reqwest::Client,
    /// Token from the last login; used when a call carries none.
    token: Mutex<Option<AccessToken>>,
    presenter: UrlPresenter,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl GraphSdk {
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}{}",
            self.options.graph_base_url, self.settings.api_version, path
        )
    }

    fn cached_token(&self) -> Option<AccessToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_token(&self, token: Option<AccessToken>) -> Option<AccessToken> {
        let mut guard = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, token)
    }

    async fn run_login_flow(&self, scopes: &[&str]) -> Result<LoginResponse> {
        let pkce = oauth::generate_pkce();
        let state = uuid::Uuid::new_v4().to_string();
        let (listener, port) = oauth::bind_callback(self.options.callback_port).await?;
        let redirect_uri = oauth::build_redirect_uri(port);
        let auth_url = oauth::build_auth_url(
            &oauth::AuthRequest {
                dialog_base_url: &self.options.dialog_base_url,
                api_version: &self.settings.api_version,
                app_id: &self.settings.app_id,
                redirect_uri: &redirect_uri,
                state: &state,
                scopes,
            },
            &pkce,
        );

        tracing::debug!(port, "waiting for login redirect");
        (self.presenter)(&auth_url);

        let callback = match tokio::time::timeout(
            self.options.login_timeout,
            oauth::wait_for_callback(&listener, &state),
        )
        .await
        {
            Ok(callback) => callback?,
            Err(_) => {
                return Ok(LoginResponse::denied(
                    LoginStatus::Unknown,
                    "timed out waiting for the login dialog",
                ));
            }
        };

        let code = match callback {
            oauth::OAuthCallback::Code(code) => code,
            oauth::OAuthCallback::Denied { error, reason } => {
                return Ok(LoginResponse::denied(
                    LoginStatus::NotAuthorized,
                    reason.unwrap_or(error),
                ));
            }
        };

        let token = self.exchange_code(&code, &redirect_uri, &pkce).await?;
        self.store_token(Some(AccessToken::new(token.access_token.clone())));

        Ok(LoginResponse::connected(AuthResponse {
            access_token: token.access_token,
            user_id: None,
            expires_in: token.expires_in,
            granted_scopes: scopes.iter().map(|s| (*s).to_string()).collect(),
        }))
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        pkce: &oauth::Pkce,
    ) -> Result<TokenResponse> {
        let mut params = vec![
            ("client_id", self.settings.app_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("code", code),
            ("code_verifier", pkce.verifier.as_str()),
        ];
        if let Some(secret) = self.options.app_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        let response = self
            .http
            .get(self.url("/oauth/access_token"))
            .query(&params)
            .send()
            .await
            .context("Failed to send token exchange request")?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse token response")?;
        if let Some(error) = body.get("error") {
            anyhow::bail!(
                "Token exchange failed (HTTP {status}): {}",
                ApiError::from_payload(error.clone())
            );
        }
        if !status.is_success() {
            anyhow::bail!("Token exchange failed (HTTP {status}): {body}");
        }
        serde_json::from_value(body).context("Failed to parse token response")
    }
}

#[async_trait]
impl SocialSdk for GraphSdk {
    async fn login(&self, scopes: &[&str]) -> LoginResponse {
        match self.run_login_flow(scopes).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "login flow failed");
                LoginResponse::denied(LoginStatus::Unknown, format!("{err:#}"))
            }
        }
    }

    async fn api(&self, path: &str, method: HttpMethod, params: &[(&str, String)]) -> ApiResponse {
        let mut query: Vec<(&str, String)> = params.to_vec();
        if !query.iter().any(|(k, _)| *k == "access_token")
            && let Some(token) = self.cached_token()
        {
            query.push(("access_token", token.expose().to_string()));
        }

        let request = match method {
            HttpMethod::Get => self.http.get(self.url(path)),
            HttpMethod::Post => self.http.post(self.url(path)),
            HttpMethod::Delete => self.http.delete(self.url(path)),
        };

        tracing::debug!(method = method.as_str(), path, "graph request");
        let response = match request.query(&query).send().await {
            Ok(response) => response,
            Err(err) => {
                return ApiResponse::error(ApiError::transport(format!(
                    "Request to {path} failed: {err}"
                )));
            }
        };

        let status = response.status();
        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                return ApiResponse::error(ApiError::transport(format!(
                    "Unreadable response from {path} (HTTP {status}): {err}"
                )));
            }
        };

        if let Some(error) = body.get("error") {
            return ApiResponse::error(ApiError::from_payload(error.clone()));
        }
        if !status.is_success() {
            return ApiResponse::error(ApiError::transport(format!(
                "HTTP {status} from {path}"
            )));
        }
        ApiResponse::data(body)
    }

    async fn logout(&self) -> Result<(), SdkError> {
        let Some(token) = self.store_token(None) else {
            return Ok(());
        };
        if !self.options.revoke_on_logout {
            return Ok(());
        }

        let params = [("access_token", token.expose().to_string())];
        let response = self
            .api("/me/permissions", HttpMethod::Delete, &params)
            .await;
        match response.error {
            Some(err) => Err(SdkError(format!("Failed to revoke permissions: {err}"))),
            None => Ok(()),
        }
    }

    fn discard_grant(&self, access_token: &str) {
        let mut guard = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref().is_some_and(|t| t.expose() == access_token) {
            *guard = None;
            tracing::debug!("dropped token of an abandoned login");
        }
    }
}
