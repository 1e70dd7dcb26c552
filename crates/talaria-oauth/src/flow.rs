//! The OAuth install flow state machine.
//!
//! Two entry points, both reached from the dispatcher: [`OAuthFlow::run_start`]
//! issues a state and redirects the browser to Slack's consent page;
//! [`OAuthFlow::run_callback`] walks the callback state machine — error
//! param, state validation, code exchange, persistence — and selects the
//! matching handler. Every terminal state is a redirect; OAuth failures are
//! logged, never surfaced to the caller as errors.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, warn};

use talaria_core::{AppConfig, Response, SlackRequest};

use crate::api::{AccessParams, AccessResponse, AccessV2Response, OAuthApi};
use crate::error::OAuthError;
use crate::installation::{Installation, InstallationStore};
use crate::state::OAuthStateStore;

/// Selects the final response after a successful installation.
pub type SuccessHandler = Arc<dyn Fn(&SlackRequest, &Installation) -> Response + Send + Sync>;

/// Selects the response when the consent redirect carried an `error` param.
pub type ErrorHandler = Arc<dyn Fn(&SlackRequest, &str) -> Response + Send + Sync>;

/// Selects the response when the install state is missing, unknown,
/// expired, or already consumed.
pub type StateErrorHandler = Arc<dyn Fn(&SlackRequest) -> Response + Send + Sync>;

/// Selects the response when the code exchange returned `ok=false`.
pub type AccessErrorHandler = Arc<dyn Fn(&SlackRequest, Option<&str>) -> Response + Send + Sync>;

/// Selects the response when the exchange or persistence failed outright.
pub type ExceptionHandler = Arc<dyn Fn(&SlackRequest, &OAuthError) -> Response + Send + Sync>;

/// The install-start and callback machinery.
pub struct OAuthFlow {
    config: AppConfig,
    state_store: Arc<dyn OAuthStateStore>,
    installation_store: Arc<dyn InstallationStore>,
    api: Arc<dyn OAuthApi>,
    success_handler: SuccessHandler,
    error_handler: ErrorHandler,
    state_error_handler: StateErrorHandler,
    access_error_handler: AccessErrorHandler,
    exception_handler: ExceptionHandler,
}

fn redirect_to(url: Option<&str>) -> Response {
    match url {
        Some(url) => Response::redirect(url),
        None => Response::new(302),
    }
}

impl OAuthFlow {
    /// Creates a flow with the default redirect handlers: `302` to the
    /// completion URL on success and to the cancellation URL on any failure.
    #[must_use]
    pub fn new(
        config: AppConfig,
        state_store: Arc<dyn OAuthStateStore>,
        installation_store: Arc<dyn InstallationStore>,
        api: Arc<dyn OAuthApi>,
    ) -> Self {
        let completion_url = config.oauth_completion_url.clone();
        let cancellation_url = config.oauth_cancellation_url.clone();
        let failure = move || redirect_to(cancellation_url.as_deref());

        let success_handler: SuccessHandler =
            Arc::new(move |_req, _installation| redirect_to(completion_url.as_deref()));
        let error_handler: ErrorHandler = {
            let failure = failure.clone();
            Arc::new(move |_req, _error| failure())
        };
        let state_error_handler: StateErrorHandler = {
            let failure = failure.clone();
            Arc::new(move |_req| failure())
        };
        let access_error_handler: AccessErrorHandler = {
            let failure = failure.clone();
            Arc::new(move |_req, _error| failure())
        };
        let exception_handler: ExceptionHandler = Arc::new(move |_req, _error| failure());

        Self {
            config,
            state_store,
            installation_store,
            api,
            success_handler,
            error_handler,
            state_error_handler,
            access_error_handler,
            exception_handler,
        }
    }

    /// Replaces the success handler.
    #[must_use]
    pub fn with_success_handler(mut self, handler: SuccessHandler) -> Self {
        self.success_handler = handler;
        self
    }

    /// Replaces the consent-error handler.
    #[must_use]
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    /// Replaces the state-error handler.
    #[must_use]
    pub fn with_state_error_handler(mut self, handler: StateErrorHandler) -> Self {
        self.state_error_handler = handler;
        self
    }

    /// Replaces the access-error handler.
    #[must_use]
    pub fn with_access_error_handler(mut self, handler: AccessErrorHandler) -> Self {
        self.access_error_handler = handler;
        self
    }

    /// Replaces the exception handler.
    #[must_use]
    pub fn with_exception_handler(mut self, handler: ExceptionHandler) -> Self {
        self.exception_handler = handler;
        self
    }

    /// Builds the Slack authorize URL for an issued state.
    ///
    /// Returns `None` when `client_id` or `scope` is not configured.
    #[must_use]
    pub fn authorize_url(&self, state: &str) -> Option<String> {
        let client_id = self.config.client_id.as_deref()?;
        let scope = self.config.scope.as_deref()?;
        let base = &self.config.authorize_url_base;

        let query = if self.config.classic_app_permissions_enabled {
            serde_urlencoded::to_string([
                ("client_id", client_id),
                ("scope", scope),
                ("state", state),
            ])
        } else {
            serde_urlencoded::to_string([
                ("client_id", client_id),
                ("scope", scope),
                ("user_scope", self.config.user_scope.as_deref().unwrap_or("")),
                ("state", state),
            ])
        }
        .ok()?;

        let path = if self.config.classic_app_permissions_enabled {
            "/oauth/authorize"
        } else {
            "/oauth/v2/authorize"
        };
        Some(format!("{base}{path}?{query}"))
    }

    /// Handles an install-start request: issue a state, redirect to consent.
    pub async fn run_start(&self, request: &SlackRequest) -> Response {
        let mut draft = Response::new(302);
        let state = match self.state_store.issue(request, &mut draft).await {
            Ok(state) => state,
            Err(err) => {
                error!(error = %err, "failed to issue an install state");
                draft.set_location(
                    self.config.oauth_cancellation_url.as_deref().unwrap_or(""),
                );
                return draft;
            }
        };
        match self.authorize_url(&state) {
            Some(url) => draft.set_location(&url),
            None => {
                error!("install URL could not be built; check client_id and scope settings");
                if let Some(url) = self.config.oauth_cancellation_url.as_deref() {
                    draft.set_location(url);
                }
            }
        }
        draft
    }

    /// Handles a consent callback, walking the state machine to a redirect.
    pub async fn run_callback(&self, request: &SlackRequest) -> Response {
        if let Some(error) = request.query_param("error") {
            error!(error = %error, "OAuth consent was refused");
            return (self.error_handler)(request, error);
        }

        let state_valid = match request.query_param("state") {
            Some(state) => self.state_store.consume(state).await,
            None => false,
        };
        if !state_valid {
            warn!("install state missing, expired, or already consumed");
            return (self.state_error_handler)(request);
        }

        let params = AccessParams {
            client_id: self.config.client_id.clone().unwrap_or_default(),
            client_secret: self.config.client_secret.clone().unwrap_or_default(),
            code: request.query_param("code").unwrap_or_default().to_string(),
            redirect_uri: self.config.redirect_uri.clone(),
        };
        let cancel = request.context.cancellation();

        let installation = if self.config.classic_app_permissions_enabled {
            match self.api.access(&params, cancel).await {
                Err(err) => {
                    let err = OAuthError::from(err);
                    error!(error = %err, "oauth.access call failed");
                    return (self.exception_handler)(request, &err);
                }
                Ok(response) if !response.ok => {
                    error!(error = ?response.error, "oauth.access returned ok=false");
                    return (self.access_error_handler)(request, response.error.as_deref());
                }
                Ok(response) => build_installation_v1(&response),
            }
        } else {
            match self.api.access_v2(&params, cancel).await {
                Err(err) => {
                    let err = OAuthError::from(err);
                    error!(error = %err, "oauth.v2.access call failed");
                    return (self.exception_handler)(request, &err);
                }
                Ok(response) if !response.ok => {
                    error!(error = ?response.error, "oauth.v2.access returned ok=false");
                    return (self.access_error_handler)(request, response.error.as_deref());
                }
                Ok(response) => build_installation_v2(&response),
            }
        };

        if let Err(err) = self.installation_store.save(installation.clone()).await {
            let err = OAuthError::from(err);
            error!(error = %err, "failed to persist the installation");
            return (self.exception_handler)(request, &err);
        }
        (self.success_handler)(request, &installation)
    }
}

fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn build_installation_v1(response: &AccessResponse) -> Installation {
    Installation {
        app_id: None,
        enterprise_id: response.enterprise_id.clone(),
        team_id: response.team_id.clone(),
        user_id: response.user_id.clone(),
        bot_token: response
            .bot
            .as_ref()
            .and_then(|b| b.bot_access_token.clone()),
        bot_user_id: response.bot.as_ref().and_then(|b| b.bot_user_id.clone()),
        bot_id: None,
        bot_scopes: response.scope.clone(),
        user_token: response.access_token.clone(),
        user_scopes: response.scope.clone(),
        installed_at: now_epoch_seconds(),
    }
}

fn build_installation_v2(response: &AccessV2Response) -> Installation {
    Installation {
        app_id: response.app_id.clone(),
        enterprise_id: response.enterprise.as_ref().map(|e| e.id.clone()),
        team_id: response.team.as_ref().map(|t| t.id.clone()),
        user_id: response.authed_user.as_ref().map(|u| u.id.clone()),
        bot_token: response.access_token.clone(),
        bot_user_id: response.bot_user_id.clone(),
        bot_id: None,
        bot_scopes: response.scope.clone(),
        user_token: response
            .authed_user
            .as_ref()
            .and_then(|u| u.access_token.clone()),
        user_scopes: response.authed_user.as_ref().and_then(|u| u.scope.clone()),
        installed_at: now_epoch_seconds(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthedUser, IdAndName};
    use crate::installation::MemoryInstallationStore;
    use crate::state::MemoryOAuthStateStore;
    use bytes::Bytes;
    use http::HeaderMap;
    use serde_json::json;
    use talaria_core::{ApiError, BoxFuture, RequestContext, RequestKind};
    use tokio_util::sync::CancellationToken;

    struct MockApi {
        v2: Result<AccessV2Response, ()>,
    }

    impl OAuthApi for MockApi {
        fn access<'a>(
            &'a self,
            _params: &'a AccessParams,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<AccessResponse, ApiError>> {
            Box::pin(async { Ok(AccessResponse::default()) })
        }

        fn access_v2<'a>(
            &'a self,
            _params: &'a AccessParams,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<AccessV2Response, ApiError>> {
            let result = self.v2.clone().map_err(|()| ApiError::Cancelled);
            Box::pin(async move { result })
        }
    }

    fn v2_success() -> AccessV2Response {
        AccessV2Response {
            ok: true,
            app_id: Some("A1".to_string()),
            access_token: Some("xoxb-X".to_string()),
            scope: Some("commands".to_string()),
            bot_user_id: Some("UBOT".to_string()),
            team: Some(IdAndName {
                id: "T1".to_string(),
                name: Some("Acme".to_string()),
            }),
            enterprise: None,
            authed_user: Some(AuthedUser {
                id: "U1".to_string(),
                access_token: None,
                scope: None,
            }),
            ..AccessV2Response::default()
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            client_id: Some("111.222".to_string()),
            client_secret: Some("sekrit".to_string()),
            scope: Some("commands,chat:write".to_string()),
            oauth_completion_url: Some("https://app.example.test/done".to_string()),
            oauth_cancellation_url: Some("https://app.example.test/sorry".to_string()),
            oauth_start_enabled: true,
            oauth_callback_enabled: true,
            ..AppConfig::default()
        }
    }

    fn callback_request(query: serde_json::Value) -> SlackRequest {
        SlackRequest {
            kind: RequestKind::OAuthCallback,
            raw_body: Bytes::new(),
            headers: HeaderMap::new(),
            payload: query,
            context: RequestContext::new(),
        }
    }

    fn flow_with(api: MockApi) -> (OAuthFlow, Arc<MemoryInstallationStore>) {
        let installations = Arc::new(MemoryInstallationStore::new());
        let flow = OAuthFlow::new(
            config(),
            Arc::new(MemoryOAuthStateStore::default()),
            Arc::clone(&installations) as Arc<dyn InstallationStore>,
            Arc::new(api),
        );
        (flow, installations)
    }

    async fn issued_state(flow: &OAuthFlow) -> String {
        let start = SlackRequest {
            kind: RequestKind::OAuthStart,
            raw_body: Bytes::new(),
            headers: HeaderMap::new(),
            payload: json!({}),
            context: RequestContext::new(),
        };
        let mut draft = Response::new(302);
        flow.state_store.issue(&start, &mut draft).await.unwrap()
    }

    #[test]
    fn authorize_url_v2_carries_user_scope() {
        let (flow, _) = flow_with(MockApi { v2: Ok(v2_success()) });
        let url = flow.authorize_url("st-1").unwrap();
        assert!(url.starts_with("https://slack.com/oauth/v2/authorize?"));
        assert!(url.contains("client_id=111.222"));
        assert!(url.contains("user_scope="));
        assert!(url.contains("state=st-1"));
    }

    #[test]
    fn authorize_url_v1_when_classic() {
        let mut classic = config();
        classic.classic_app_permissions_enabled = true;
        let flow = OAuthFlow::new(
            classic,
            Arc::new(MemoryOAuthStateStore::default()),
            Arc::new(MemoryInstallationStore::new()),
            Arc::new(MockApi { v2: Ok(v2_success()) }),
        );
        let url = flow.authorize_url("st-1").unwrap();
        assert!(url.starts_with("https://slack.com/oauth/authorize?"));
        assert!(!url.contains("user_scope"));
    }

    #[tokio::test]
    async fn start_redirects_to_consent_page() {
        let (flow, _) = flow_with(MockApi { v2: Ok(v2_success()) });
        let start = SlackRequest {
            kind: RequestKind::OAuthStart,
            raw_body: Bytes::new(),
            headers: HeaderMap::new(),
            payload: json!({}),
            context: RequestContext::new(),
        };
        let response = flow.run_start(&start).await;
        assert_eq!(response.status, 302);
        assert!(response
            .location()
            .unwrap()
            .starts_with("https://slack.com/oauth/v2/authorize?"));
    }

    #[tokio::test]
    async fn start_without_scope_redirects_to_cancellation() {
        let mut broken = config();
        broken.scope = None;
        let flow = OAuthFlow::new(
            broken,
            Arc::new(MemoryOAuthStateStore::default()),
            Arc::new(MemoryInstallationStore::new()),
            Arc::new(MockApi { v2: Ok(v2_success()) }),
        );
        let start = SlackRequest {
            kind: RequestKind::OAuthStart,
            raw_body: Bytes::new(),
            headers: HeaderMap::new(),
            payload: json!({}),
            context: RequestContext::new(),
        };
        let response = flow.run_start(&start).await;
        assert_eq!(
            response.location(),
            Some("https://app.example.test/sorry")
        );
    }

    #[tokio::test]
    async fn callback_success_saves_installation_and_redirects() {
        let (flow, installations) = flow_with(MockApi { v2: Ok(v2_success()) });
        let state = issued_state(&flow).await;

        let request = callback_request(json!({"code": "c-1", "state": state}));
        let response = flow.run_callback(&request).await;

        assert_eq!(response.status, 302);
        assert_eq!(response.location(), Some("https://app.example.test/done"));
        let saved = installations
            .find_bot(None, Some("T1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.bot_token.as_deref(), Some("xoxb-X"));
        assert_eq!(saved.bot_user_id.as_deref(), Some("UBOT"));
    }

    #[tokio::test]
    async fn callback_with_consent_error_redirects_to_cancellation() {
        let (flow, installations) = flow_with(MockApi { v2: Ok(v2_success()) });
        let request = callback_request(json!({"error": "access_denied"}));
        let response = flow.run_callback(&request).await;
        assert_eq!(response.location(), Some("https://app.example.test/sorry"));
        assert!(installations.find_bot(None, Some("T1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn callback_with_unknown_state_redirects_to_cancellation() {
        let (flow, _) = flow_with(MockApi { v2: Ok(v2_success()) });
        let request = callback_request(json!({"code": "c-1", "state": "forged"}));
        let response = flow.run_callback(&request).await;
        assert_eq!(response.location(), Some("https://app.example.test/sorry"));
    }

    #[tokio::test]
    async fn callback_with_access_error_redirects_to_cancellation() {
        let denied = AccessV2Response {
            ok: false,
            error: Some("invalid_code".to_string()),
            ..AccessV2Response::default()
        };
        let (flow, _) = flow_with(MockApi { v2: Ok(denied) });
        let state = issued_state(&flow).await;
        let request = callback_request(json!({"code": "bad", "state": state}));
        let response = flow.run_callback(&request).await;
        assert_eq!(response.location(), Some("https://app.example.test/sorry"));
    }

    #[tokio::test]
    async fn callback_with_transport_error_redirects_to_cancellation() {
        let (flow, _) = flow_with(MockApi { v2: Err(()) });
        let state = issued_state(&flow).await;
        let request = callback_request(json!({"code": "c-1", "state": state}));
        let response = flow.run_callback(&request).await;
        assert_eq!(response.location(), Some("https://app.example.test/sorry"));
    }

    #[tokio::test]
    async fn state_reuse_reaches_exchange_once() {
        let (flow, _) = flow_with(MockApi { v2: Ok(v2_success()) });
        let state = issued_state(&flow).await;

        let first = flow
            .run_callback(&callback_request(json!({"code": "c-1", "state": state})))
            .await;
        let second = flow
            .run_callback(&callback_request(json!({"code": "c-1", "state": state})))
            .await;

        assert_eq!(first.location(), Some("https://app.example.test/done"));
        assert_eq!(second.location(), Some("https://app.example.test/sorry"));
    }
}
