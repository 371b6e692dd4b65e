//! Authentication state and the three operations that change it.
//!
//! State lives in a `watch` channel: every transition is one critical
//! section, so subscribers never observe a token without a user or the
//! reverse. The store is owned by the UI root and handed the SDK at
//! construction; nothing here is global.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{ApiError, SessionError};
use crate::models::{AccessToken, Post, User};
use crate::sdk::{HttpMethod, SdkError, SocialSdk};

/// Permissions requested by [`SessionStore::login`].
pub const LOGIN_SCOPES: &[&str] = &["public_profile", "user_posts"];
pub const PROFILE_FIELDS: &str = "id,name,picture";
pub const POST_FIELDS: &str = "id,message,created_time,full_picture,permalink_url";
/// Maximum number of posts returned by one fetch.
pub const PAGE_SIZE: usize = 10;

const SESSION_ENDED_DURING_LOGIN: &str = "session ended during login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: User,
    pub token: AccessToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    /// A login is pending. `prior` holds the credentials of the session the
    /// login started from, which stay usable until the login settles.
    Authenticating { prior: Option<Credentials> },
    Authenticated(Credentials),
}

impl SessionState {
    /// Credentials usable right now, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            SessionState::Authenticated(creds) => Some(creds),
            SessionState::Authenticating { prior } => prior.as_ref(),
            SessionState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials().is_some()
    }

    pub fn is_authenticating(&self) -> bool {
        matches!(self, SessionState::Authenticating { .. })
    }

    /// Flat view consumed by presentational code.
    pub fn session(&self) -> Session {
        match self.credentials() {
            Some(creds) => Session {
                authenticated: true,
                user: Some(creds.user.clone()),
                token: Some(creds.token.clone()),
            },
            None => Session::default(),
        }
    }
}

/// Snapshot of the observable session fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub user: Option<User>,
    pub token: Option<AccessToken>,
}

#[derive(Deserialize)]
struct PostsPage {
    #[serde(default)]
    data: Vec<Post>,
}

pub struct SessionStore {
    sdk: Arc<dyn SocialSdk>,
    state: watch::Sender<SessionState>,
    /// Bumped by every login start and every reset; a login may only commit
    /// while the value it started with is still current.
    generation: AtomicU64,
}

impl SessionStore {
    /// Creates an anonymous store on top of a ready SDK.
    pub fn new(sdk: Arc<dyn SocialSdk>) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            sdk,
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Session {
        self.state.borrow().session()
    }

    /// Receives every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Runs the interactive login, then reads the profile.
    ///
    /// The session only becomes authenticated once both steps succeed; on any
    /// failure the state the login started from is restored.
    ///
    /// # Errors
    /// - [`SessionError::LoginInProgress`] if another login is pending.
    /// - [`SessionError::LoginCancelled`] if no grant was obtained or the
    ///   session was reset while the login was pending.
    /// - [`SessionError::ProfileFetchFailed`] if the profile read failed.
    pub async fn login(&self) -> Result<(), SessionError> {
        let mut attempt = self.begin_login()?;

        let response = self.sdk.login(LOGIN_SCOPES).await;
        let Some(grant) = response.auth_response else {
            tracing::info!(
                status = ?response.status,
                reason = ?response.error_reason,
                "login cancelled"
            );
            return Err(SessionError::LoginCancelled(response.error_reason));
        };

        let token = AccessToken::new(grant.access_token);
        attempt.granted = Some(token.clone());
        let user = self
            .fetch_profile(&token)
            .await
            .map_err(SessionError::ProfileFetchFailed)?;

        let user_id = user.id.clone();
        if attempt.commit(Credentials { user, token }) {
            tracing::debug!(%user_id, "session authenticated");
            Ok(())
        } else {
            tracing::info!(%user_id, "discarding login that outlived its session");
            Err(SessionError::LoginCancelled(Some(
                SESSION_ENDED_DURING_LOGIN.to_string(),
            )))
        }
    }

    /// Ends the session.
    ///
    /// Local state is reset before this returns; the platform logout runs in
    /// the background and its outcome never changes local state.
    pub fn logout(&self) -> LogoutHandle {
        self.reset();

        let sdk = Arc::clone(&self.sdk);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => LogoutHandle(Some(runtime.spawn(async move {
                let result = sdk.logout().await;
                if let Err(err) = &result {
                    tracing::warn!(error = %err, "remote logout failed");
                }
                result
            }))),
            Err(_) => {
                tracing::warn!("no async runtime; skipping remote logout");
                LogoutHandle(None)
            }
        }
    }

    /// Returns the store to `Anonymous` without contacting the platform.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = SessionState::Anonymous;
        });
        tracing::debug!("session reset");
    }

    /// Reads one page of the user's most recent posts.
    ///
    /// # Errors
    /// - [`SessionError::NotAuthenticated`] without usable credentials; no
    ///   request is made.
    /// - [`SessionError::FetchFailed`] with the platform error as received.
    pub async fn fetch_posts(&self) -> Result<Vec<Post>, SessionError> {
        let token = self
            .state
            .borrow()
            .credentials()
            .map(|creds| creds.token.clone())
            .ok_or(SessionError::NotAuthenticated)?;

        let params = [
            ("fields", POST_FIELDS.to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("access_token", token.expose().to_string()),
        ];
        let response = self.sdk.api("/me/posts", HttpMethod::Get, &params).await;

        if let Some(err) = response.error {
            tracing::warn!(error = %err, "posts fetch failed");
            return Err(SessionError::FetchFailed(err));
        }
        let data = response
            .data
            .ok_or_else(|| SessionError::FetchFailed(ApiError::empty_response("posts")))?;
        let page: PostsPage = serde_json::from_value(data)
            .map_err(|err| SessionError::FetchFailed(ApiError::malformed("posts", &err)))?;

        let mut posts = page.data;
        posts.truncate(PAGE_SIZE);
        tracing::debug!(count = posts.len(), "posts fetched");
        Ok(posts)
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<User, ApiError> {
        let params = [
            ("fields", PROFILE_FIELDS.to_string()),
            ("access_token", token.expose().to_string()),
        ];
        let response = self.sdk.api("/me", HttpMethod::Get, &params).await;

        if let Some(err) = response.error {
            tracing::warn!(error = %err, "profile fetch failed");
            return Err(err);
        }
        let data = response
            .data
            .ok_or_else(|| ApiError::empty_response("user profile"))?;
        serde_json::from_value(data).map_err(|err| ApiError::malformed("user profile", &err))
    }

    fn begin_login(&self) -> Result<LoginAttempt<'_>, SessionError> {
        let mut generation = None;
        self.state.send_if_modified(|state| {
            if state.is_authenticating() {
                return false;
            }
            let prior = match std::mem::take(state) {
                SessionState::Authenticated(creds) => Some(creds),
                _ => None,
            };
            *state = SessionState::Authenticating { prior };
            generation = Some(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
            true
        });

        match generation {
            Some(generation) => Ok(LoginAttempt {
                store: self,
                generation,
                granted: None,
                settled: false,
            }),
            None => {
                tracing::debug!("login rejected: another login is pending");
                Err(SessionError::LoginInProgress)
            }
        }
    }
}

/// A pending login. Dropping it without a commit restores the prior state
/// and hands any granted token back to the SDK.
struct LoginAttempt<'a> {
    store: &'a SessionStore,
    generation: u64,
    granted: Option<AccessToken>,
    settled: bool,
}

impl LoginAttempt<'_> {
    /// Publishes the credentials. Returns false if the session was reset
    /// while the login was pending.
    fn commit(mut self, creds: Credentials) -> bool {
        let generation = self.generation;
        let store = self.store;
        self.settled = store.state.send_if_modified(move |state| {
            if store.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = SessionState::Authenticated(creds);
            true
        });
        self.settled
    }
}

impl Drop for LoginAttempt<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(token) = self.granted.take() {
            self.store.sdk.discard_grant(token.expose());
        }
        let generation = self.generation;
        let store = self.store;
        store.state.send_if_modified(|state| {
            if store.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = match std::mem::take(state) {
                SessionState::Authenticating { prior: Some(creds) } => {
                    SessionState::Authenticated(creds)
                }
                _ => SessionState::Anonymous,
            };
            true
        });
    }
}

/// Background platform logout started by [`SessionStore::logout`].
///
/// Dropping the handle leaves the call running.
#[derive(Debug)]
pub struct LogoutHandle(Option<JoinHandle<Result<(), SdkError>>>);

impl LogoutHandle {
    /// Waits for the platform logout. `None` if it never ran.
    pub async fn remote_outcome(self) -> Option<Result<(), SdkError>> {
        let handle = self.0?;
        Some(match handle.await {
            Ok(result) => result,
            Err(err) => Err(SdkError(format!("logout task failed: {err}"))),
        })
    }
}
