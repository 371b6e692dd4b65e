//! User-facing notifications for session operations.

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

/// A short title/description pair shown after an operation completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    fn new(title: &str, description: impl Into<String>, variant: ToastVariant) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant,
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }

    pub fn sdk_load_failed() -> Self {
        Self::new(
            "Error",
            "Failed to load Facebook SDK. Please try again later.",
            ToastVariant::Destructive,
        )
    }

    pub fn sdk_loading() -> Self {
        Self::new(
            "Loading",
            "Facebook SDK is still loading. Please wait a moment.",
            ToastVariant::Default,
        )
    }

    pub fn login_succeeded() -> Self {
        Self::new(
            "Success",
            "Successfully logged in with Facebook!",
            ToastVariant::Default,
        )
    }

    /// The description is the error's own message.
    pub fn login_failed(err: &SessionError) -> Self {
        Self::new("Login Failed", err.to_string(), ToastVariant::Destructive)
    }

    pub fn logged_out() -> Self {
        Self::new(
            "Logged Out",
            "You've been successfully logged out.",
            ToastVariant::Default,
        )
    }

    pub fn posts_failed() -> Self {
        Self::new(
            "Error",
            "Failed to load your Facebook posts. Please try again.",
            ToastVariant::Destructive,
        )
    }

    pub fn refreshed() -> Self {
        Self::new(
            "Refreshed",
            "Your posts have been refreshed.",
            ToastVariant::Default,
        )
    }

    pub fn refresh_failed() -> Self {
        Self::new(
            "Error",
            "Failed to refresh posts.",
            ToastVariant::Destructive,
        )
    }
}

impl std::fmt::Display for Toast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}
