//! Request classification.
//!
//! The parser normalizes an already-received HTTP request into a
//! [`SlackRequest`] with exactly one [`RequestKind`]. Classification rules
//! run in a fixed order; a request matching none of them is a parse error,
//! never a silent fallthrough.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method};
use serde_json::{Map, Value};

use crate::config::AppConfig;
use crate::context::RequestContext;
use crate::error::ParseError;
use crate::request::{RequestKind, SlackRequest};
use crate::signature::TIMESTAMP_HEADER;

/// An HTTP request as handed over by the hosting server.
#[derive(Debug, Clone)]
pub struct RawRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Raw query string, when present.
    pub query: Option<String>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Raw body bytes.
    pub body: Bytes,
}

impl RawRequest {
    /// Creates a bodyless request.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the query string.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Appends a header. Invalid names or values are dropped.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<http::header::HeaderName>(),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim())
            .unwrap_or("")
    }
}

/// State-free request classifier.
#[derive(Debug, Clone)]
pub struct RequestParser {
    oauth_start_path: String,
    oauth_callback_path: String,
    oauth_start_enabled: bool,
    oauth_callback_enabled: bool,
}

impl RequestParser {
    /// Creates a parser wired to the app's OAuth endpoint configuration.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            oauth_start_path: config.oauth_start_path.clone(),
            oauth_callback_path: config.oauth_callback_path.clone(),
            oauth_start_enabled: config.oauth_start_enabled,
            oauth_callback_enabled: config.oauth_callback_enabled,
        }
    }

    /// Classifies a raw request.
    ///
    /// Rules are evaluated in order: OAuth paths, JSON bodies
    /// (`url_verification`, `event_callback`), form bodies with a `payload`
    /// field (interactive kinds keyed by the payload's `type`), slash
    /// commands, then outgoing webhooks.
    ///
    /// # Errors
    ///
    /// [`ParseError::UnrecognizedRequest`] when no rule matches;
    /// [`ParseError::MalformedJson`] / [`ParseError::MalformedForm`] when a
    /// body fails to decode as its declared content type.
    pub fn parse(&self, raw: RawRequest) -> Result<SlackRequest, ParseError> {
        if self.oauth_start_enabled && raw.path == self.oauth_start_path {
            return Ok(self.build(RequestKind::OAuthStart, &raw, query_payload(&raw)?));
        }
        if self.oauth_callback_enabled && raw.path == self.oauth_callback_path {
            return Ok(self.build(RequestKind::OAuthCallback, &raw, query_payload(&raw)?));
        }

        match raw.content_type() {
            "application/json" => self.parse_json(raw),
            "application/x-www-form-urlencoded" => self.parse_form(raw),
            _ => Err(ParseError::UnrecognizedRequest),
        }
    }

    fn parse_json(&self, raw: RawRequest) -> Result<SlackRequest, ParseError> {
        let body: Value = serde_json::from_slice(&raw.body)?;
        let kind = match body.get("type").and_then(Value::as_str) {
            Some("url_verification") => RequestKind::UrlVerification,
            Some("event_callback") => RequestKind::Event,
            _ => return Err(ParseError::UnrecognizedRequest),
        };
        Ok(self.build(kind, &raw, body))
    }

    fn parse_form(&self, raw: RawRequest) -> Result<SlackRequest, ParseError> {
        let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(&raw.body)?;
        let mut form = Map::new();
        for (name, value) in fields {
            form.insert(name, Value::String(value));
        }

        if let Some(Value::String(payload)) = form.get("payload") {
            let payload: Value = serde_json::from_str(payload)?;
            let kind = match payload.get("type").and_then(Value::as_str) {
                Some("block_actions") => RequestKind::BlockAction,
                Some("block_suggestion") => RequestKind::BlockSuggestion,
                Some("message_action") => RequestKind::MessageAction,
                Some("interactive_message") => RequestKind::AttachmentAction,
                Some("view_submission") => RequestKind::ViewSubmission,
                Some("view_closed") => RequestKind::ViewClosed,
                Some("dialog_submission") => RequestKind::DialogSubmission,
                Some("dialog_suggestion") => RequestKind::DialogSuggestion,
                Some("dialog_cancellation") => RequestKind::DialogCancellation,
                _ => return Err(ParseError::UnrecognizedRequest),
            };
            return Ok(self.build(kind, &raw, payload));
        }

        // An ssl_check probe is addressed to a slash command URL, so it is
        // classified as a slash command for the SslCheck middleware to answer.
        if form.contains_key("command") || form.contains_key("ssl_check") {
            return Ok(self.build(RequestKind::SlashCommand, &raw, Value::Object(form)));
        }
        if form.contains_key("trigger_word") {
            return Ok(self.build(RequestKind::OutgoingWebhook, &raw, Value::Object(form)));
        }
        Err(ParseError::UnrecognizedRequest)
    }

    fn build(&self, kind: RequestKind, raw: &RawRequest, payload: Value) -> SlackRequest {
        let mut context = RequestContext::new();
        if let Some(ts) = raw
            .headers
            .get(TIMESTAMP_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
        {
            context.set_request_timestamp(ts);
        }
        SlackRequest {
            kind,
            raw_body: raw.body.clone(),
            headers: raw.headers.clone(),
            payload,
            context,
        }
    }
}

fn query_payload(raw: &RawRequest) -> Result<Value, ParseError> {
    let query = raw.query.as_deref().unwrap_or("");
    let fields: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
    let mut map = Map::new();
    for (name, value) in fields {
        map.insert(name, Value::String(value));
    }
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> RequestParser {
        let config = AppConfig {
            client_id: Some("111.222".to_string()),
            oauth_start_enabled: true,
            oauth_callback_enabled: true,
            ..AppConfig::default()
        };
        RequestParser::new(&config)
    }

    fn json_post(body: &str) -> RawRequest {
        RawRequest::new(Method::POST, "/slack/events")
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    fn form_post(body: &str) -> RawRequest {
        RawRequest::new(Method::POST, "/slack/events")
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_body(body.to_string())
    }

    #[test]
    fn classifies_url_verification() {
        let req = parser()
            .parse(json_post(r#"{"type":"url_verification","challenge":"abc"}"#))
            .unwrap();
        assert_eq!(req.kind, RequestKind::UrlVerification);
        assert_eq!(req.challenge(), Some("abc"));
    }

    #[test]
    fn classifies_event_callback_with_key() {
        let body = r#"{"type":"event_callback","team_id":"T1","event":{"type":"app_mention"}}"#;
        let req = parser().parse(json_post(body)).unwrap();
        assert_eq!(req.kind, RequestKind::Event);
        assert_eq!(req.event_key().as_deref(), Some("app_mention:null"));
    }

    #[test]
    fn classifies_slash_command() {
        let req = parser()
            .parse(form_post("command=%2Fhelp&text=deploy&team_id=T1"))
            .unwrap();
        assert_eq!(req.kind, RequestKind::SlashCommand);
        assert_eq!(req.command(), Some("/help"));
        assert_eq!(req.team_id(), Some("T1"));
    }

    #[test]
    fn classifies_ssl_check_as_slash_command() {
        let req = parser().parse(form_post("ssl_check=1&token=legacy")).unwrap();
        assert_eq!(req.kind, RequestKind::SlashCommand);
        assert!(req.is_ssl_check());
    }

    #[test]
    fn classifies_outgoing_webhook() {
        let req = parser()
            .parse(form_post("trigger_word=deploy&text=deploy+now"))
            .unwrap();
        assert_eq!(req.kind, RequestKind::OutgoingWebhook);
        assert_eq!(req.trigger_word(), Some("deploy"));
    }

    #[test]
    fn classifies_interactive_payloads() {
        let cases = [
            ("block_actions", RequestKind::BlockAction),
            ("block_suggestion", RequestKind::BlockSuggestion),
            ("message_action", RequestKind::MessageAction),
            ("interactive_message", RequestKind::AttachmentAction),
            ("view_submission", RequestKind::ViewSubmission),
            ("view_closed", RequestKind::ViewClosed),
            ("dialog_submission", RequestKind::DialogSubmission),
            ("dialog_suggestion", RequestKind::DialogSuggestion),
            ("dialog_cancellation", RequestKind::DialogCancellation),
        ];
        for (type_name, kind) in cases {
            let payload = format!(r#"{{"type":"{type_name}","callback_id":"x"}}"#);
            let body = serde_urlencoded::to_string([("payload", payload)]).unwrap();
            let req = parser().parse(form_post(&body)).unwrap();
            assert_eq!(req.kind, kind, "payload type {type_name}");
        }
    }

    #[test]
    fn classifies_oauth_paths() {
        let start = RawRequest::new(Method::GET, "/slack/install");
        let req = parser().parse(start).unwrap();
        assert_eq!(req.kind, RequestKind::OAuthStart);

        let callback = RawRequest::new(Method::GET, "/slack/oauth_redirect")
            .with_query("code=abc&state=xyz");
        let req = parser().parse(callback).unwrap();
        assert_eq!(req.kind, RequestKind::OAuthCallback);
        assert_eq!(req.query_param("code"), Some("abc"));
        assert_eq!(req.query_param("state"), Some("xyz"));
    }

    #[test]
    fn oauth_paths_ignored_when_disabled() {
        let config = AppConfig::default();
        let parser = RequestParser::new(&config);
        let raw = RawRequest::new(Method::GET, "/slack/install");
        assert!(matches!(
            parser.parse(raw),
            Err(ParseError::UnrecognizedRequest)
        ));
    }

    #[test]
    fn unknown_payload_type_is_a_parse_error() {
        let body = serde_urlencoded::to_string([("payload", r#"{"type":"mystery"}"#)]).unwrap();
        assert!(matches!(
            parser().parse(form_post(&body)),
            Err(ParseError::UnrecognizedRequest)
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            parser().parse(json_post("{not json")),
            Err(ParseError::MalformedJson(_))
        ));
    }

    #[test]
    fn timestamp_header_lands_in_context() {
        let raw = json_post(r#"{"type":"url_verification","challenge":"x"}"#)
            .with_header("x-slack-request-timestamp", "1700000000");
        let req = parser().parse(raw).unwrap();
        assert_eq!(req.context.request_timestamp(), Some(1_700_000_000));
    }

    #[test]
    fn reparsing_same_input_is_stable() {
        let body = r#"{"type":"event_callback","event":{"type":"reaction_added"}}"#;
        let a = parser().parse(json_post(body)).unwrap();
        let b = parser().parse(json_post(body)).unwrap();
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.payload, b.payload);
        assert_eq!(a.raw_body, b.raw_body);
    }
}
