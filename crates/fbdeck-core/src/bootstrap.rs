//! One-time loading of the platform SDK.
//!
//! The loader plays the part of injecting the vendor script and calling its
//! `init`. [`SdkBootstrap::initialize`] runs it at most once successfully;
//! concurrent callers share the in-flight attempt and its outcome, and a
//! failed attempt leaves the bootstrap empty so the next call retries.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::SessionError;
use crate::sdk::SocialSdk;

/// Default Graph API version.
pub const DEFAULT_API_VERSION: &str = "v18.0";

/// Parameters handed to the SDK `init` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkSettings {
    pub app_id: String,
    /// Keep platform cookies between calls.
    pub cookie: bool,
    pub api_version: String,
}

impl SdkSettings {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            cookie: true,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

/// Loads and initializes an SDK instance.
#[async_trait]
pub trait SdkLoader: Send + Sync {
    async fn load(&self, settings: &SdkSettings) -> anyhow::Result<Arc<dyn SocialSdk>>;
}

pub struct SdkBootstrap {
    settings: SdkSettings,
    loader: Box<dyn SdkLoader>,
    sdk: OnceCell<Arc<dyn SocialSdk>>,
    /// The load in flight, shared by every caller until it settles.
    attempt: Mutex<Option<Arc<LoadAttempt>>>,
}

type LoadAttempt = OnceCell<Result<Arc<dyn SocialSdk>, SessionError>>;

impl SdkBootstrap {
    pub fn new(settings: SdkSettings, loader: impl SdkLoader + 'static) -> Self {
        Self {
            settings,
            loader: Box::new(loader),
            sdk: OnceCell::new(),
            attempt: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &SdkSettings {
        &self.settings
    }

    /// Returns true once a load has completed successfully.
    pub fn is_ready(&self) -> bool {
        self.sdk.initialized()
    }

    /// Returns the loaded SDK without triggering a load.
    pub fn sdk(&self) -> Option<Arc<dyn SocialSdk>> {
        self.sdk.get().cloned()
    }

    /// Loads the SDK if needed and returns the shared handle.
    ///
    /// Callers that arrive while a load is running wait for it and get its
    /// outcome, failure included. Only a call made after a failed load has
    /// settled starts a new one.
    ///
    /// # Errors
    /// Returns [`SessionError::SdkLoadFailed`] if the loader fails. No timeout is
    /// applied here.
    pub async fn initialize(&self) -> Result<Arc<dyn SocialSdk>, SessionError> {
        if let Some(sdk) = self.sdk.get() {
            return Ok(Arc::clone(sdk));
        }

        let attempt = Arc::clone(
            self.attempt
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get_or_insert_with(|| Arc::new(OnceCell::new())),
        );

        let outcome = attempt
            .get_or_init(|| async {
                tracing::debug!(
                    app_id = %self.settings.app_id,
                    version = %self.settings.api_version,
                    "loading sdk"
                );
                self.loader.load(&self.settings).await.map_err(|err| {
                    tracing::warn!(error = %format!("{err:#}"), "sdk load failed");
                    SessionError::SdkLoadFailed(format!("{err:#}"))
                })
            })
            .await
            .clone();

        {
            let mut current = self.attempt.lock().unwrap_or_else(PoisonError::into_inner);
            if current.as_ref().is_some_and(|a| Arc::ptr_eq(a, &attempt)) {
                *current = None;
            }
        }

        let sdk = outcome?;
        Ok(Arc::clone(self.sdk.get_or_init(|| async { sdk }).await))
    }
}
