//! App configuration.
//!
//! [`AppConfig`] is an explicit value constructed by the embedder; there is
//! no global configuration state. Tests instantiate isolated configs, and
//! [`AppConfig::from_env`] covers the common deployment path where secrets
//! arrive through `SLACK_*` environment variables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default path recognized as the OAuth install-start endpoint.
pub const DEFAULT_OAUTH_START_PATH: &str = "/slack/install";

/// Default path recognized as the OAuth callback endpoint.
pub const DEFAULT_OAUTH_CALLBACK_PATH: &str = "/slack/oauth_redirect";

/// Default base URL for Slack Web API calls.
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api/";

/// Default base URL for the OAuth authorize redirect.
pub const DEFAULT_AUTHORIZE_URL_BASE: &str = "https://slack.com";

/// Default install-state TTL in seconds.
pub const DEFAULT_STATE_EXPIRATION_SECONDS: u64 = 600;

/// Configuration for a single Slack app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Signing secret issued by Slack, used for request verification.
    pub signing_secret: Option<String>,

    /// Legacy verification token accepted by the `ssl_check` probe.
    pub verification_token: Option<String>,

    /// Static bot token enabling the single-workspace authorization path.
    pub single_team_bot_token: Option<String>,

    /// Bot user id paired with `single_team_bot_token`. When absent it is
    /// resolved once via `auth.test` and cached.
    pub single_team_bot_user_id: Option<String>,

    /// OAuth client id. Its presence marks the app as distributed.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Bot scopes requested at install time (comma-separated).
    pub scope: Option<String>,

    /// User scopes requested at install time (v2 flow only).
    pub user_scope: Option<String>,

    /// Absolute URL Slack redirects to after consent.
    pub redirect_uri: Option<String>,

    /// Path the parser recognizes as the OAuth install-start endpoint.
    pub oauth_start_path: String,

    /// Path the parser recognizes as the OAuth callback endpoint.
    pub oauth_callback_path: String,

    /// Final redirect target after a successful installation.
    pub oauth_completion_url: Option<String>,

    /// Final redirect target after a failed installation.
    pub oauth_cancellation_url: Option<String>,

    /// Whether the install-start endpoint is served.
    pub oauth_start_enabled: bool,

    /// Whether the callback endpoint is served.
    pub oauth_callback_enabled: bool,

    /// Selects the classic (v1) install URL and access call.
    pub classic_app_permissions_enabled: bool,

    /// Install-state TTL in seconds.
    pub state_expiration_seconds: u64,

    /// Base URL for Slack Web API calls. Overridable for tests.
    pub api_base_url: String,

    /// Base URL for the OAuth authorize redirect. Overridable for tests.
    pub authorize_url_base: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            signing_secret: None,
            verification_token: None,
            single_team_bot_token: None,
            single_team_bot_user_id: None,
            client_id: None,
            client_secret: None,
            scope: None,
            user_scope: None,
            redirect_uri: None,
            oauth_start_path: DEFAULT_OAUTH_START_PATH.to_string(),
            oauth_callback_path: DEFAULT_OAUTH_CALLBACK_PATH.to_string(),
            oauth_completion_url: None,
            oauth_cancellation_url: None,
            oauth_start_enabled: false,
            oauth_callback_enabled: false,
            classic_app_permissions_enabled: false,
            state_expiration_seconds: DEFAULT_STATE_EXPIRATION_SECONDS,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            authorize_url_base: DEFAULT_AUTHORIZE_URL_BASE.to_string(),
        }
    }
}

/// Configuration validation failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

impl AppConfig {
    /// Creates a config with the given signing secret and defaults elsewhere.
    #[must_use]
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: Some(signing_secret.into()),
            ..Self::default()
        }
    }

    /// Reads configuration from `SLACK_*` environment variables.
    ///
    /// Recognized variables: `SLACK_SIGNING_SECRET`, `SLACK_VERIFICATION_TOKEN`,
    /// `SLACK_BOT_TOKEN`, `SLACK_CLIENT_ID`, `SLACK_CLIENT_SECRET`,
    /// `SLACK_SCOPE`, `SLACK_USER_SCOPE`, `SLACK_REDIRECT_URI`,
    /// `SLACK_OAUTH_COMPLETION_URL`, `SLACK_OAUTH_CANCELLATION_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let mut config = Self {
            signing_secret: var("SLACK_SIGNING_SECRET"),
            verification_token: var("SLACK_VERIFICATION_TOKEN"),
            single_team_bot_token: var("SLACK_BOT_TOKEN"),
            client_id: var("SLACK_CLIENT_ID"),
            client_secret: var("SLACK_CLIENT_SECRET"),
            scope: var("SLACK_SCOPE"),
            user_scope: var("SLACK_USER_SCOPE"),
            redirect_uri: var("SLACK_REDIRECT_URI"),
            oauth_completion_url: var("SLACK_OAUTH_COMPLETION_URL"),
            oauth_cancellation_url: var("SLACK_OAUTH_CANCELLATION_URL"),
            ..Self::default()
        };
        if config.is_distributed_app() {
            config.oauth_start_enabled = true;
            config.oauth_callback_enabled = true;
        }
        config
    }

    /// A distributed (multi-workspace) app is one with an OAuth client id.
    #[must_use]
    pub fn is_distributed_app(&self) -> bool {
        self.client_id.is_some()
    }

    /// Validates the settings needed for the configured mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the signing secret is absent, or
    /// when OAuth endpoints are enabled without client credentials and scopes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_none() {
            return Err(ConfigError::Missing("signing_secret"));
        }
        if self.oauth_start_enabled || self.oauth_callback_enabled {
            if self.client_id.is_none() {
                return Err(ConfigError::Missing("client_id"));
            }
            if self.client_secret.is_none() {
                return Err(ConfigError::Missing("client_secret"));
            }
            if self.scope.is_none() {
                return Err(ConfigError::Missing("scope"));
            }
        }
        Ok(())
    }
}
