//! Scripted [`SocialSdk`] used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::sdk::{
    ApiResponse, AuthResponse, HttpMethod, LoginResponse, LoginStatus, SdkError, SocialSdk,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Login(Vec<String>),
    Api {
        path: String,
        method: HttpMethod,
        params: Vec<(String, String)>,
    },
    Logout,
    DiscardGrant(String),
}

#[derive(Default)]
pub struct MockSdk {
    logins: Mutex<VecDeque<LoginResponse>>,
    api: Mutex<VecDeque<ApiResponse>>,
    logout_result: Mutex<Option<SdkError>>,
    login_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<Call>>,
}

impl MockSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(self, token: &str) -> Self {
        self.push_login(LoginResponse::connected(AuthResponse {
            access_token: token.to_string(),
            user_id: Some("10231".to_string()),
            expires_in: Some(5183944),
            granted_scopes: vec!["public_profile".to_string(), "user_posts".to_string()],
        }))
    }

    pub fn cancel(self) -> Self {
        self.push_login(LoginResponse::default())
    }

    pub fn push_login(self, response: LoginResponse) -> Self {
        self.logins.lock().unwrap().push_back(response);
        self
    }

    pub fn respond(self, response: ApiResponse) -> Self {
        self.api.lock().unwrap().push_back(response);
        self
    }

    pub fn fail_logout(self, message: &str) -> Self {
        *self.logout_result.lock().unwrap() = Some(SdkError(message.to_string()));
        self
    }

    pub fn slow_login(self, delay: Duration) -> Self {
        *self.login_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn api_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Api { .. }))
            .count()
    }

    pub fn login_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Login(_)))
            .count()
    }
}

#[async_trait]
impl SocialSdk for MockSdk {
    async fn login(&self, scopes: &[&str]) -> LoginResponse {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Login(scopes.iter().map(|s| (*s).to_string()).collect()));
        let delay = *self.login_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.logins
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| LoginResponse::denied(LoginStatus::Unknown, "no scripted login"))
    }

    async fn api(&self, path: &str, method: HttpMethod, params: &[(&str, String)]) -> ApiResponse {
        self.calls.lock().unwrap().push(Call::Api {
            path: path.to_string(),
            method,
            params: params
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        });
        self.api.lock().unwrap().pop_front().unwrap_or_default()
    }

    async fn logout(&self) -> Result<(), SdkError> {
        self.calls.lock().unwrap().push(Call::Logout);
        match self.logout_result.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn discard_grant(&self, access_token: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(Call::DiscardGrant(access_token.to_string()));
    }
}

pub fn profile_json() -> serde_json::Value {
    serde_json::json!({
        "id": "10231",
        "name": "Ada Lovelace",
        "picture": { "data": { "url": "https://cdn.example/ada.jpg" } }
    })
}

/// A `/me/posts` body holding `count` posts, newest first.
pub fn posts_body(count: usize) -> serde_json::Value {
    let posts: Vec<_> = (0..count)
        .map(|i| {
            serde_json::json!({
                "id": format!("10231_{i}"),
                "message": format!("post number {i}"),
                "created_time": format!("2024-03-{:02}T10:00:00+0000", 28 - i.min(27)),
            })
        })
        .collect();
    serde_json::json!({ "data": posts, "paging": { "cursors": { "before": "a", "after": "b" } } })
}
