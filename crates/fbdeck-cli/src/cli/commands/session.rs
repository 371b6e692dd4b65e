//! Session command handlers: the interactive prompt and one-shot `posts`.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use fbdeck_core::bootstrap::SdkBootstrap;
use fbdeck_core::config::Config;
use fbdeck_core::graph::{self, GraphLoader, UrlPresenter};
use fbdeck_core::session::{Session, SessionStore};
use fbdeck_core::toast::Toast;
use tokio::io::AsyncBufReadExt;
use tokio::task::JoinHandle;

use crate::view;

const HELP: &str = "\
Commands:
  login     Log in with Facebook
  posts     Show your most recent posts
  refresh   Reload your posts
  logout    End the session
  whoami    Show the current session
  help      Show this help
  quit      Exit";

fn build_bootstrap(config: &Config) -> Result<Arc<SdkBootstrap>> {
    let options = config.graph_options().context("resolve Graph options")?;
    let presenter = login_presenter(options.open_browser);
    Ok(Arc::new(SdkBootstrap::new(
        config.sdk_settings(),
        GraphLoader::new(options, presenter),
    )))
}

fn login_presenter(open_browser: bool) -> UrlPresenter {
    Arc::new(move |url: &str| {
        println!("To log in with Facebook:");
        println!();
        println!("  1. A browser window will open (or visit the URL below)");
        println!("  2. Log in to Facebook and allow access to your posts");
        println!("  3. Return here once the browser confirms the login");
        println!();
        println!("Login URL:");
        println!("  {url}");
        println!();

        if open_browser {
            graph::open_in_browser(url);
        }
    })
}

fn show(toast: &Toast) {
    if toast.is_destructive() {
        eprintln!("{}", view::toast_line(toast));
    } else {
        println!("{}", view::toast_line(toast));
    }
}

/// Logs in, prints one page of posts and ends the session.
pub async fn posts(config: &Config) -> Result<()> {
    let bootstrap = build_bootstrap(config)?;
    posts_once(&bootstrap).await
}

async fn posts_once(bootstrap: &SdkBootstrap) -> Result<()> {
    let sdk = bootstrap.initialize().await.inspect_err(|_| {
        show(&Toast::sdk_load_failed());
    })?;

    let store = SessionStore::new(sdk);
    if let Err(err) = store.login().await {
        show(&Toast::login_failed(&err));
        return Err(err.into());
    }
    show(&Toast::login_succeeded());

    let fetched = store.fetch_posts().await;

    // The session ends whether or not the read worked.
    if let Some(Err(err)) = store.logout().remote_outcome().await {
        tracing::warn!(error = %err, "remote logout failed");
    }

    let posts = fetched.inspect_err(|_| {
        show(&Toast::posts_failed());
    })?;
    print!("{}", view::posts_list(&posts, Utc::now()));
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login,
    Posts,
    Refresh,
    Logout,
    Whoami,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "" => Command::Empty,
            "login" => Command::Login,
            "posts" => Command::Posts,
            "refresh" => Command::Refresh,
            "logout" => Command::Logout,
            "whoami" | "me" => Command::Whoami,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// State of one interactive run.
struct Interactive {
    bootstrap: Arc<SdkBootstrap>,
    loading: Option<JoinHandle<()>>,
    store: Option<SessionStore>,
}

impl Interactive {
    /// Starts loading the SDK in the background unless a load is running.
    fn start_loading(&mut self) {
        if self.loading.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let bootstrap = Arc::clone(&self.bootstrap);
        self.loading = Some(tokio::spawn(async move {
            if let Err(err) = bootstrap.initialize().await {
                tracing::warn!(error = %err, "SDK load failed");
                show(&Toast::sdk_load_failed());
            }
        }));
    }

    /// The store, once the SDK is ready.
    fn store(&mut self) -> Option<&SessionStore> {
        if self.store.is_none() {
            let sdk = self.bootstrap.sdk()?;
            self.store = Some(SessionStore::new(sdk));
        }
        self.store.as_ref()
    }

    fn session(&self) -> Session {
        self.store
            .as_ref()
            .map(SessionStore::session)
            .unwrap_or_default()
    }

    async fn login(&mut self) {
        if !self.bootstrap.is_ready() {
            show(&Toast::sdk_loading());
            self.start_loading();
            return;
        }
        let Some(store) = self.store() else {
            return;
        };
        match store.login().await {
            Ok(()) => {
                show(&Toast::login_succeeded());
                print!("{}", view::login_card(&store.session()));
                self.load_posts(false).await;
            }
            Err(err) => show(&Toast::login_failed(&err)),
        }
    }

    async fn load_posts(&self, refresh: bool) {
        let Some(store) = self.store.as_ref().filter(|s| s.session().authenticated) else {
            println!("Not logged in. Type `login` first.");
            return;
        };

        print!("{}", view::loading_placeholder());
        match store.fetch_posts().await {
            Ok(posts) => {
                print!("{}", view::posts_list(&posts, Utc::now()));
                if refresh {
                    show(&Toast::refreshed());
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, refresh, "posts fetch failed");
                if refresh {
                    show(&Toast::refresh_failed());
                } else {
                    show(&Toast::posts_failed());
                }
            }
        }
    }

    fn logout(&self) {
        match self.store.as_ref() {
            Some(store) if store.session().authenticated => {
                // The remote call finishes in the background.
                drop(store.logout());
                show(&Toast::logged_out());
                print!("{}", view::login_card(&store.session()));
            }
            _ => println!("Not logged in."),
        }
    }
}

/// Runs the prompt until `quit` or end of input.
pub async fn interactive(config: &Config) -> Result<()> {
    let mut session = Interactive {
        bootstrap: build_bootstrap(config)?,
        loading: None,
        store: None,
    };
    session.start_loading();

    print!("{}", view::login_card(&Session::default()));
    println!();
    println!("Type `login` to connect, `help` for all commands.");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("fbdeck> ");
        io::stdout().flush().context("flush stdout")?;

        let Some(line) = lines.next_line().await.context("read command")? else {
            println!();
            break;
        };

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Login => session.login().await,
            Command::Posts => session.load_posts(false).await,
            Command::Refresh => session.load_posts(true).await,
            Command::Logout => session.logout(),
            Command::Whoami => print!("{}", view::login_card(&session.session())),
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Unknown(other) => {
                println!("Unknown command: {other}. Type `help` for the list.");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use fbdeck_core::bootstrap::{SdkLoader, SdkSettings};
    use fbdeck_core::error::ApiError;
    use fbdeck_core::sdk::{
        ApiResponse, AuthResponse, HttpMethod, LoginResponse, SdkError, SocialSdk,
    };

    use super::*;

    /// Grants every login and serves the profile; `/me/posts` answers with
    /// `posts`.
    struct ScriptedSdk {
        posts: ApiResponse,
        logouts: AtomicUsize,
    }

    #[async_trait]
    impl SocialSdk for ScriptedSdk {
        async fn login(&self, _scopes: &[&str]) -> LoginResponse {
            LoginResponse::connected(AuthResponse {
                access_token: "EAAB-cli-session-token-0000".to_string(),
                user_id: None,
                expires_in: None,
                granted_scopes: Vec::new(),
            })
        }

        async fn api(
            &self,
            path: &str,
            _method: HttpMethod,
            _params: &[(&str, String)],
        ) -> ApiResponse {
            if path == "/me" {
                ApiResponse::data(serde_json::json!({ "id": "10231", "name": "Ada Lovelace" }))
            } else {
                self.posts.clone()
            }
        }

        async fn logout(&self) -> Result<(), SdkError> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FixedLoader(Arc<ScriptedSdk>);

    #[async_trait]
    impl SdkLoader for FixedLoader {
        async fn load(&self, _settings: &SdkSettings) -> Result<Arc<dyn SocialSdk>> {
            Ok(Arc::clone(&self.0) as Arc<dyn SocialSdk>)
        }
    }

    fn scripted(posts: ApiResponse) -> (Arc<ScriptedSdk>, SdkBootstrap) {
        let sdk = Arc::new(ScriptedSdk {
            posts,
            logouts: AtomicUsize::new(0),
        });
        let bootstrap = SdkBootstrap::new(
            SdkSettings::new("1234567890"),
            FixedLoader(Arc::clone(&sdk)),
        );
        (sdk, bootstrap)
    }

    #[tokio::test]
    async fn test_posts_once_logs_out_after_failed_fetch() {
        let (sdk, bootstrap) = scripted(ApiResponse::error(ApiError::from_payload(
            serde_json::json!({ "message": "Application request limit reached", "code": 4 }),
        )));

        let err = posts_once(&bootstrap).await.unwrap_err();

        assert!(err.to_string().contains("Failed to fetch posts"));
        assert_eq!(sdk.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_posts_once_logs_out_after_success() {
        let (sdk, bootstrap) = scripted(ApiResponse::data(serde_json::json!({ "data": [] })));

        posts_once(&bootstrap).await.unwrap();

        assert_eq!(sdk.logouts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  LOGIN \n"), Command::Login);
        assert_eq!(Command::parse("refresh"), Command::Refresh);
        assert_eq!(Command::parse("exit"), Command::Quit);
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(
            Command::parse("delete"),
            Command::Unknown("delete".to_string())
        );
    }
}
