//! The typed request record.
//!
//! A [`SlackRequest`] is the output of the parser: the inferred
//! [`RequestKind`], the raw body (kept for signature verification and event
//! re-broadcast), the original headers, the kind-specific parsed payload,
//! and the per-request [`RequestContext`]. Accessor methods expose the
//! selection keys each kind dispatches on, so neither the dispatcher nor
//! middleware reach into JSON paths themselves.

use bytes::Bytes;
use http::HeaderMap;
use serde_json::Value;
use std::fmt;

use crate::context::RequestContext;

/// The closed set of request kinds this framework understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Events API endpoint ownership probe.
    UrlVerification,
    /// Events API delivery (`event_callback`).
    Event,
    /// Slash command form post.
    SlashCommand,
    /// Block Kit interaction (`block_actions`).
    BlockAction,
    /// Block Kit external select options (`block_suggestion`).
    BlockSuggestion,
    /// Message shortcut (`message_action`).
    MessageAction,
    /// Legacy attachment interaction (`interactive_message`).
    AttachmentAction,
    /// Modal submission (`view_submission`).
    ViewSubmission,
    /// Modal dismissal (`view_closed`).
    ViewClosed,
    /// Dialog submission.
    DialogSubmission,
    /// Dialog external select options.
    DialogSuggestion,
    /// Dialog dismissal.
    DialogCancellation,
    /// Legacy outgoing webhook.
    OutgoingWebhook,
    /// OAuth install-start endpoint.
    OAuthStart,
    /// OAuth consent callback endpoint.
    OAuthCallback,
}

impl RequestKind {
    /// A stable lowercase name, used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UrlVerification => "url_verification",
            Self::Event => "event",
            Self::SlashCommand => "slash_command",
            Self::BlockAction => "block_action",
            Self::BlockSuggestion => "block_suggestion",
            Self::MessageAction => "message_action",
            Self::AttachmentAction => "attachment_action",
            Self::ViewSubmission => "view_submission",
            Self::ViewClosed => "view_closed",
            Self::DialogSubmission => "dialog_submission",
            Self::DialogSuggestion => "dialog_suggestion",
            Self::DialogCancellation => "dialog_cancellation",
            Self::OutgoingWebhook => "outgoing_webhook",
            Self::OAuthStart => "oauth_start",
            Self::OAuthCallback => "oauth_callback",
        }
    }

    /// Whether this kind belongs to the OAuth install flow.
    ///
    /// OAuth endpoints are browser redirects, not signed Slack deliveries,
    /// so verification and authorization middleware skip them.
    #[must_use]
    pub fn is_oauth(self) -> bool {
        matches!(self, Self::OAuthStart | Self::OAuthCallback)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key for Events API handlers: `"{type}:{subtype}"`, with the
/// literal `null` standing in for an absent subtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    event_type: String,
    subtype: Option<String>,
}

impl EventKey {
    /// A key for an event type with no subtype.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            subtype: None,
        }
    }

    /// A key for an event type with a subtype.
    #[must_use]
    pub fn with_subtype(event_type: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            subtype: Some(subtype.into()),
        }
    }

    /// Parses `"type"` or `"type:subtype"`; the literal `null` subtype is
    /// treated as absent.
    #[must_use]
    pub fn parse(key: &str) -> Self {
        match key.split_once(':') {
            None => Self::new(key),
            Some((event_type, "null")) => Self::new(event_type),
            Some((event_type, subtype)) => Self::with_subtype(event_type, subtype),
        }
    }

    /// The canonical `"{type}:{subtype}"` string.
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{}:{}",
            self.event_type,
            self.subtype.as_deref().unwrap_or("null")
        )
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<&str> for EventKey {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

/// A classified request from Slack.
#[derive(Debug)]
pub struct SlackRequest {
    /// The inferred request kind.
    pub kind: RequestKind,
    /// The raw request body, as delivered.
    pub raw_body: Bytes,
    /// The original request headers.
    pub headers: HeaderMap,
    /// Kind-specific structured payload: the whole JSON body for events,
    /// the decoded `payload` field for interactive kinds, form fields for
    /// commands/webhooks, query parameters for OAuth kinds.
    pub payload: Value,
    /// Per-request mutable context.
    pub context: RequestContext,
}

impl SlackRequest {
    /// Returns the first value of a header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The raw body as UTF-8, for signature verification and re-broadcast.
    #[must_use]
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.raw_body).unwrap_or("")
    }

    fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }

    /// The `challenge` of a `url_verification` probe.
    #[must_use]
    pub fn challenge(&self) -> Option<&str> {
        self.payload_str("challenge")
    }

    /// The event's `type`.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.payload
            .get("event")
            .and_then(|e| e.get("type"))
            .and_then(Value::as_str)
    }

    /// The event's `subtype`, when present.
    #[must_use]
    pub fn event_subtype(&self) -> Option<&str> {
        self.payload
            .get("event")
            .and_then(|e| e.get("subtype"))
            .and_then(Value::as_str)
    }

    /// The `"{type}:{subtype}"` selection key of an Events API delivery.
    #[must_use]
    pub fn event_key(&self) -> Option<String> {
        let event_type = self.event_type()?;
        Some(match self.event_subtype() {
            Some(subtype) => EventKey::with_subtype(event_type, subtype).key(),
            None => EventKey::new(event_type).key(),
        })
    }

    /// The event's `user` field.
    #[must_use]
    pub fn event_user(&self) -> Option<&str> {
        self.payload
            .get("event")
            .and_then(|e| e.get("user"))
            .and_then(Value::as_str)
    }

    /// The event's `bot_id` field.
    #[must_use]
    pub fn event_bot_id(&self) -> Option<&str> {
        self.payload
            .get("event")
            .and_then(|e| e.get("bot_id"))
            .and_then(Value::as_str)
    }

    /// The `command` of a slash command post.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.payload_str("command")
    }

    /// The `trigger_word` of an outgoing webhook post.
    #[must_use]
    pub fn trigger_word(&self) -> Option<&str> {
        self.payload_str("trigger_word")
    }

    /// The `callback_id` this kind dispatches on. For modal kinds it lives
    /// under `view.callback_id`; everywhere else at the top level.
    #[must_use]
    pub fn callback_id(&self) -> Option<&str> {
        match self.kind {
            RequestKind::ViewSubmission | RequestKind::ViewClosed => self
                .payload
                .get("view")
                .and_then(|v| v.get("callback_id"))
                .and_then(Value::as_str),
            _ => self.payload_str("callback_id"),
        }
    }

    /// The `action_id` of a `block_suggestion` payload.
    #[must_use]
    pub fn action_id(&self) -> Option<&str> {
        self.payload_str("action_id")
    }

    /// The `action_id` of the first entry in a `block_actions` payload.
    #[must_use]
    pub fn first_action_id(&self) -> Option<&str> {
        self.payload
            .get("actions")
            .and_then(Value::as_array)
            .and_then(|actions| actions.first())
            .and_then(|a| a.get("action_id"))
            .and_then(Value::as_str)
    }

    /// The number of actions in a `block_actions` payload.
    #[must_use]
    pub fn actions_len(&self) -> usize {
        self.payload
            .get("actions")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// The workspace id, wherever this payload carries it.
    #[must_use]
    pub fn team_id(&self) -> Option<&str> {
        self.payload_str("team_id")
            .or_else(|| {
                self.payload
                    .get("team")
                    .and_then(|t| t.get("id"))
                    .and_then(Value::as_str)
            })
            .or_else(|| {
                self.payload
                    .get("user")
                    .and_then(|u| u.get("team_id"))
                    .and_then(Value::as_str)
            })
    }

    /// The enterprise (org) id, wherever this payload carries it.
    #[must_use]
    pub fn enterprise_id(&self) -> Option<&str> {
        self.payload_str("enterprise_id").or_else(|| {
            self.payload
                .get("enterprise")
                .and_then(|e| e.get("id"))
                .and_then(Value::as_str)
        })
    }

    /// The requesting user's id.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.payload_str("user_id").or_else(|| {
            self.payload
                .get("user")
                .and_then(|u| u.get("id"))
                .and_then(Value::as_str)
        })
    }

    /// A query parameter of an OAuth request.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.payload_str(name)
    }

    /// Whether this is an `ssl_check` probe.
    #[must_use]
    pub fn is_ssl_check(&self) -> bool {
        self.payload_str("ssl_check") == Some("1")
    }

    /// The legacy verification `token` field, when present.
    #[must_use]
    pub fn verification_token(&self) -> Option<&str> {
        self.payload_str("token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(kind: RequestKind, payload: Value) -> SlackRequest {
        SlackRequest {
            kind,
            raw_body: Bytes::new(),
            headers: HeaderMap::new(),
            payload,
            context: RequestContext::new(),
        }
    }

    #[test]
    fn event_key_renders_null_subtype() {
        assert_eq!(EventKey::new("app_mention").key(), "app_mention:null");
        assert_eq!(
            EventKey::with_subtype("message", "bot_message").key(),
            "message:bot_message"
        );
    }

    #[test]
    fn event_key_parse() {
        assert_eq!(EventKey::parse("app_mention"), EventKey::new("app_mention"));
        assert_eq!(EventKey::parse("message:null"), EventKey::new("message"));
        assert_eq!(
            EventKey::parse("message:channel_join"),
            EventKey::with_subtype("message", "channel_join")
        );
    }

    #[test]
    fn event_accessors() {
        let req = request(
            RequestKind::Event,
            json!({
                "team_id": "T1",
                "event": {"type": "message", "subtype": "bot_message", "bot_id": "B1"}
            }),
        );
        assert_eq!(req.event_key().as_deref(), Some("message:bot_message"));
        assert_eq!(req.event_bot_id(), Some("B1"));
        assert_eq!(req.team_id(), Some("T1"));
    }

    #[test]
    fn event_key_defaults_subtype_to_null() {
        let req = request(
            RequestKind::Event,
            json!({"event": {"type": "app_mention"}}),
        );
        assert_eq!(req.event_key().as_deref(), Some("app_mention:null"));
    }

    #[test]
    fn callback_id_lives_under_view_for_modals() {
        let modal = request(
            RequestKind::ViewSubmission,
            json!({"view": {"callback_id": "submit-intake"}}),
        );
        assert_eq!(modal.callback_id(), Some("submit-intake"));

        let shortcut = request(
            RequestKind::MessageAction,
            json!({"callback_id": "triage"}),
        );
        assert_eq!(shortcut.callback_id(), Some("triage"));
    }

    #[test]
    fn first_action_id_picks_head_of_list() {
        let req = request(
            RequestKind::BlockAction,
            json!({"actions": [{"action_id": "a"}, {"action_id": "b"}]}),
        );
        assert_eq!(req.first_action_id(), Some("a"));
        assert_eq!(req.actions_len(), 2);
    }

    #[test]
    fn team_id_from_nested_team_object() {
        let req = request(
            RequestKind::BlockAction,
            json!({"team": {"id": "T9", "domain": "acme"}}),
        );
        assert_eq!(req.team_id(), Some("T9"));
    }
}
