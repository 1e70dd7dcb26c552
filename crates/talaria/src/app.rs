//! The App: parser, chain, registry, and lifecycle tied together.
//!
//! A single [`App`] value is shared across however many server threads or
//! tasks the embedder runs; every [`App::run`] call is independent. The
//! middleware list and handler registry are snapshotted per dispatch, so
//! late registration cannot corrupt an in-flight request.

use parking_lot::{Mutex, RwLock};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, warn};

use talaria_core::{
    ApiClient, AppConfig, AppResult, BoxFuture, EventKey, RawRequest, RequestKind, RequestParser,
    Response, SlackHandler, SlackRequest,
};
use talaria_middleware::stages::{
    IgnoringSelfEvents, MultiTeamsAuthorization, RequestVerification, SingleTeamAuthorization,
    SslCheck,
};
use talaria_middleware::{run_chain, Middleware};
use talaria_oauth::{
    AccessErrorHandler, ErrorHandler, ExceptionHandler, HttpOAuthApi, InstallationStore,
    MemoryInstallationStore, MemoryOAuthStateStore, OAuthApi, OAuthFlow, OAuthStateStore,
    StateErrorHandler, SuccessHandler,
};

use crate::events::{EventListener, EventsDispatcher};
use crate::registry::HandlerRegistry;

/// App lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    /// Not yet started, or stopped.
    Stopped,
    /// Accepting requests.
    Running,
}

/// Custom OAuth callback handlers, applied when the flow is built on start.
#[derive(Default)]
struct OAuthOverrides {
    success: Option<SuccessHandler>,
    error: Option<ErrorHandler>,
    state_error: Option<StateErrorHandler>,
    access_error: Option<AccessErrorHandler>,
    exception: Option<ExceptionHandler>,
}

/// A Slack app instance.
pub struct App {
    config: AppConfig,
    client: ApiClient,
    parser: RequestParser,
    registry: RwLock<HandlerRegistry>,
    middleware: Mutex<Option<Arc<Vec<Arc<dyn Middleware>>>>>,
    status: Mutex<AppStatus>,
    never_started: AtomicBool,
    installation_store: Arc<dyn InstallationStore>,
    state_store: Arc<dyn OAuthStateStore>,
    oauth_api: Arc<dyn OAuthApi>,
    oauth_flow: Mutex<Option<Arc<OAuthFlow>>>,
    oauth_overrides: Mutex<OAuthOverrides>,
    events: EventsDispatcher,
}

impl App {
    /// Creates an app with in-memory stores and the production OAuth API.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let client = ApiClient::new(config.api_base_url.clone());
        let parser = RequestParser::new(&config);
        let state_store: Arc<dyn OAuthStateStore> =
            Arc::new(MemoryOAuthStateStore::new(config.state_expiration_seconds));
        let oauth_api: Arc<dyn OAuthApi> = Arc::new(HttpOAuthApi::new(client.clone()));
        Self {
            config,
            client,
            parser,
            registry: RwLock::new(HandlerRegistry::default()),
            middleware: Mutex::new(None),
            status: Mutex::new(AppStatus::Stopped),
            never_started: AtomicBool::new(true),
            installation_store: Arc::new(MemoryInstallationStore::new()),
            state_store,
            oauth_api,
            oauth_flow: Mutex::new(None),
            oauth_overrides: Mutex::new(OAuthOverrides::default()),
            events: EventsDispatcher::new(),
        }
    }

    /// The app's configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> AppStatus {
        *self.status.lock()
    }

    /// Replaces the installation store.
    #[must_use]
    pub fn with_installation_store(mut self, store: Arc<dyn InstallationStore>) -> Self {
        self.installation_store = store;
        self
    }

    /// Replaces the install-state store.
    #[must_use]
    pub fn with_oauth_state_store(mut self, store: Arc<dyn OAuthStateStore>) -> Self {
        self.state_store = store;
        self
    }

    /// Replaces the OAuth access API, e.g. with a mock in tests.
    #[must_use]
    pub fn with_oauth_api(mut self, api: Arc<dyn OAuthApi>) -> Self {
        self.oauth_api = api;
        self
    }

    // ----------------------
    // Middleware

    /// Appends a middleware after the defaults.
    ///
    /// The default chain is materialized on first use, so user middleware
    /// always runs after verification and authorization.
    pub fn use_middleware(&self, middleware: impl Middleware) -> &Self {
        let mut guard = self.middleware.lock();
        let mut list = match guard.take() {
            Some(existing) => existing.as_ref().clone(),
            None => self.build_default_middleware(),
        };
        list.push(Arc::new(middleware));
        *guard = Some(Arc::new(list));
        self
    }

    fn build_default_middleware(&self) -> Vec<Arc<dyn Middleware>> {
        let mut list: Vec<Arc<dyn Middleware>> = Vec::new();
        list.push(Arc::new(SslCheck::new(self.config.verification_token.clone())));
        match self.config.signing_secret.as_deref() {
            Some(secret) => list.push(Arc::new(RequestVerification::new(secret))),
            None => warn!("no signing_secret configured; request verification is disabled"),
        }
        if self.config.is_distributed_app() {
            list.push(Arc::new(MultiTeamsAuthorization::new(Arc::clone(
                &self.installation_store,
            ))));
        } else if let Some(token) = self.config.single_team_bot_token.as_deref() {
            list.push(Arc::new(SingleTeamAuthorization::new(
                token,
                self.config.single_team_bot_user_id.clone(),
            )));
        } else {
            warn!("no authorization middleware configured; register your own with use_middleware");
        }
        list.push(Arc::new(IgnoringSelfEvents::new()));
        list
    }

    // ----------------------
    // Lifecycle

    /// Transitions to `Running`. Idempotent. Materializes the default
    /// middleware list when none was provided, builds the OAuth services,
    /// and starts the auxiliary events dispatcher if it has listeners.
    pub fn start(&self) -> &Self {
        let mut status = self.status.lock();
        if *status == AppStatus::Stopped {
            {
                let mut middleware = self.middleware.lock();
                if middleware.is_none() {
                    *middleware = Some(Arc::new(self.build_default_middleware()));
                }
            }
            self.init_oauth_flow();
            if !self.events.is_empty() {
                self.events.start();
            }
            self.never_started.store(false, Ordering::SeqCst);
        }
        *status = AppStatus::Running;
        self
    }

    /// Transitions to `Stopped`. Idempotent.
    pub fn stop(&self) -> &Self {
        let mut status = self.status.lock();
        if *status == AppStatus::Running {
            self.events.stop();
        }
        *status = AppStatus::Stopped;
        self
    }

    fn init_oauth_flow(&self) {
        if !self.config.is_distributed_app()
            || !(self.config.oauth_start_enabled || self.config.oauth_callback_enabled)
        {
            return;
        }
        let mut flow_slot = self.oauth_flow.lock();
        if flow_slot.is_some() {
            return;
        }
        let mut flow = OAuthFlow::new(
            self.config.clone(),
            Arc::clone(&self.state_store),
            Arc::clone(&self.installation_store),
            Arc::clone(&self.oauth_api),
        );
        let mut overrides = self.oauth_overrides.lock();
        if let Some(handler) = overrides.success.take() {
            flow = flow.with_success_handler(handler);
        }
        if let Some(handler) = overrides.error.take() {
            flow = flow.with_error_handler(handler);
        }
        if let Some(handler) = overrides.state_error.take() {
            flow = flow.with_state_error_handler(handler);
        }
        if let Some(handler) = overrides.access_error.take() {
            flow = flow.with_access_error_handler(handler);
        }
        if let Some(handler) = overrides.exception.take() {
            flow = flow.with_exception_handler(handler);
        }
        *flow_slot = Some(Arc::new(flow));
    }

    // ----------------------
    // Running

    /// Parses and runs a raw HTTP request.
    ///
    /// Requests that match no known kind are answered with `400` here;
    /// everything else flows through [`App::run`].
    ///
    /// # Errors
    ///
    /// Propagates handler failures, exactly as [`App::run`] does.
    pub async fn handle(&self, raw: RawRequest) -> AppResult<Response> {
        match self.parser.parse(raw) {
            Ok(request) => self.run(request).await,
            Err(err) => {
                warn!(error = %err, "failed to classify an incoming request");
                Ok(Response::json(400, r#"{"error":"invalid_request"}"#))
            }
        }
    }

    /// Runs a classified request through the chain to its handler.
    ///
    /// # Errors
    ///
    /// Handler failures propagate untouched; the HTTP adapter is expected
    /// to answer them with `500`.
    pub async fn run(&self, mut request: SlackRequest) -> AppResult<Response> {
        request.context.set_client(self.client.clone());
        if let Some(url) = self.config.oauth_cancellation_url.as_deref() {
            request.context.set_oauth_cancellation_url(url);
        }
        if self.never_started.load(Ordering::SeqCst) {
            self.start();
        }
        let middlewares = self
            .middleware
            .lock()
            .clone()
            .unwrap_or_else(|| Arc::new(Vec::new()));
        run_chain(&middlewares, request, move |req| self.dispatch(req)).await
    }

    // ----------------------
    // Terminal dispatch

    fn dispatch<'a>(&'a self, request: SlackRequest) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            match request.kind {
                RequestKind::UrlVerification => Ok(Response::plain(
                    200,
                    request.challenge().unwrap_or_default(),
                )),
                RequestKind::Event => {
                    if self.events.is_running() {
                        self.events.enqueue(request.body_str());
                    }
                    let key = request.event_key().unwrap_or_default();
                    let handler = self.registry.read().events.find(&key);
                    match handler {
                        Some(handler) => handler.handle(&request).await,
                        None => Ok(no_handler(request.kind, &key)),
                    }
                }
                RequestKind::SlashCommand => {
                    let key = request.command().unwrap_or_default().to_string();
                    let handler = self.registry.read().commands.find(&key);
                    match handler {
                        Some(handler) => handler.handle(&request).await,
                        None => Ok(no_handler(request.kind, &key)),
                    }
                }
                RequestKind::OutgoingWebhook => {
                    let key = request.trigger_word().unwrap_or_default().to_string();
                    let handler = self.registry.read().webhooks.find(&key);
                    match handler {
                        Some(handler) => handler.handle(&request).await,
                        None => Ok(no_handler(request.kind, &key)),
                    }
                }
                RequestKind::BlockAction => {
                    // Only the first action's response is consumable by
                    // Slack, so only the first action's handler runs.
                    let key = request.first_action_id().unwrap_or_default().to_string();
                    let handler = self.registry.read().block_actions.find(&key);
                    match handler {
                        Some(handler) => handler.handle(&request).await,
                        None => Ok(no_handler(request.kind, &key)),
                    }
                }
                RequestKind::BlockSuggestion => {
                    let key = request.action_id().unwrap_or_default().to_string();
                    let handler = self.registry.read().block_suggestions.find(&key);
                    match handler {
                        Some(handler) => handler.handle(&request).await,
                        None => Ok(no_handler(request.kind, &key)),
                    }
                }
                RequestKind::MessageAction
                | RequestKind::AttachmentAction
                | RequestKind::ViewSubmission
                | RequestKind::ViewClosed
                | RequestKind::DialogSubmission
                | RequestKind::DialogSuggestion
                | RequestKind::DialogCancellation => {
                    let key = request.callback_id().unwrap_or_default().to_string();
                    let handler = {
                        let registry = self.registry.read();
                        match request.kind {
                            RequestKind::MessageAction => registry.message_actions.find(&key),
                            RequestKind::AttachmentAction => {
                                registry.attachment_actions.find(&key)
                            }
                            RequestKind::ViewSubmission => registry.view_submissions.find(&key),
                            RequestKind::ViewClosed => registry.view_closed.find(&key),
                            RequestKind::DialogSubmission => {
                                registry.dialog_submissions.find(&key)
                            }
                            RequestKind::DialogSuggestion => {
                                registry.dialog_suggestions.find(&key)
                            }
                            _ => registry.dialog_cancellations.find(&key),
                        }
                    };
                    match handler {
                        Some(handler) => handler.handle(&request).await,
                        None => Ok(no_handler(request.kind, &key)),
                    }
                }
                RequestKind::OAuthStart => {
                    let flow = self.oauth_flow.lock().clone();
                    match flow {
                        Some(flow) if self.config.oauth_start_enabled => {
                            Ok(flow.run_start(&request).await)
                        }
                        _ => Ok(oauth_not_ready()),
                    }
                }
                RequestKind::OAuthCallback => {
                    let flow = self.oauth_flow.lock().clone();
                    match flow {
                        Some(flow) if self.config.oauth_callback_enabled => {
                            Ok(flow.run_callback(&request).await)
                        }
                        _ => Ok(oauth_not_ready()),
                    }
                }
            }
        })
    }

    // ----------------------
    // Handler registration

    /// Registers an Events API handler for a `"{type}:{subtype}"` key.
    pub fn event(&self, key: impl Into<EventKey>, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .events
            .insert(key.into().key(), Arc::new(handler));
        self
    }

    /// Registers a raw-event listener on the auxiliary events dispatcher.
    pub fn event_listener(&self, listener: EventListener) -> &Self {
        self.events.register(listener);
        self
    }

    /// Registers a slash command handler for an exact command name.
    pub fn command(&self, command: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .commands
            .insert_str(command, Arc::new(handler));
        self
    }

    /// Registers a slash command handler for a pattern.
    pub fn command_pattern(&self, command: Regex, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .commands
            .insert(command, Arc::new(handler));
        self
    }

    /// Registers a Block Kit action handler for an exact `action_id`.
    pub fn block_action(&self, action_id: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .block_actions
            .insert_str(action_id, Arc::new(handler));
        self
    }

    /// Registers a Block Kit action handler for a pattern.
    pub fn block_action_pattern(&self, action_id: Regex, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .block_actions
            .insert(action_id, Arc::new(handler));
        self
    }

    /// Registers a Block Kit suggestion handler for an exact `action_id`.
    pub fn block_suggestion(&self, action_id: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .block_suggestions
            .insert_str(action_id, Arc::new(handler));
        self
    }

    /// Registers a message shortcut handler for an exact `callback_id`.
    pub fn message_action(&self, callback_id: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .message_actions
            .insert_str(callback_id, Arc::new(handler));
        self
    }

    /// Registers an attachment action handler for an exact `callback_id`.
    pub fn attachment_action(&self, callback_id: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .attachment_actions
            .insert_str(callback_id, Arc::new(handler));
        self
    }

    /// Registers a modal submission handler for an exact `callback_id`.
    pub fn view_submission(&self, callback_id: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .view_submissions
            .insert_str(callback_id, Arc::new(handler));
        self
    }

    /// Registers a modal dismissal handler for an exact `callback_id`.
    pub fn view_closed(&self, callback_id: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .view_closed
            .insert_str(callback_id, Arc::new(handler));
        self
    }

    /// Registers a dialog submission handler for an exact `callback_id`.
    pub fn dialog_submission(&self, callback_id: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .dialog_submissions
            .insert_str(callback_id, Arc::new(handler));
        self
    }

    /// Registers a dialog suggestion handler for an exact `callback_id`.
    pub fn dialog_suggestion(&self, callback_id: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .dialog_suggestions
            .insert_str(callback_id, Arc::new(handler));
        self
    }

    /// Registers a dialog cancellation handler for an exact `callback_id`.
    pub fn dialog_cancellation(&self, callback_id: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .dialog_cancellations
            .insert_str(callback_id, Arc::new(handler));
        self
    }

    /// Registers an outgoing webhook handler for an exact `trigger_word`.
    pub fn webhook(&self, trigger_word: &str, handler: impl SlackHandler) -> &Self {
        self.registry
            .write()
            .webhooks
            .insert(trigger_word.to_string(), Arc::new(handler));
        self
    }

    // ----------------------
    // OAuth callback handlers

    /// Replaces the OAuth success handler.
    pub fn oauth_success(&self, handler: SuccessHandler) -> &Self {
        self.oauth_overrides.lock().success = Some(handler);
        self
    }

    /// Replaces the OAuth consent-error handler.
    pub fn oauth_error(&self, handler: ErrorHandler) -> &Self {
        self.oauth_overrides.lock().error = Some(handler);
        self
    }

    /// Replaces the OAuth state-error handler.
    pub fn oauth_state_error(&self, handler: StateErrorHandler) -> &Self {
        self.oauth_overrides.lock().state_error = Some(handler);
        self
    }

    /// Replaces the OAuth access-error handler.
    pub fn oauth_access_error(&self, handler: AccessErrorHandler) -> &Self {
        self.oauth_overrides.lock().access_error = Some(handler);
        self
    }

    /// Replaces the OAuth exception handler.
    pub fn oauth_exception(&self, handler: ExceptionHandler) -> &Self {
        self.oauth_overrides.lock().exception = Some(handler);
        self
    }
}

fn no_handler(kind: RequestKind, key: &str) -> Response {
    warn!(kind = %kind, key, "no handler found");
    Response::json(404, r#"{"error":"no handler found"}"#)
}

fn oauth_not_ready() -> Response {
    error!("received an OAuth request but this app is not configured for the OAuth flow");
    Response::plain(500, "the OAuth flow is not enabled for this app")
}
