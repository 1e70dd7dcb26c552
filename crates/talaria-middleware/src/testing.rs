//! Shared request builders for this crate's tests.

use bytes::Bytes;
use http::HeaderMap;
use serde_json::{json, Value};

use talaria_core::{RequestContext, RequestKind, SlackRequest};

pub(crate) fn request(kind: RequestKind, payload: Value) -> SlackRequest {
    SlackRequest {
        kind,
        raw_body: Bytes::new(),
        headers: HeaderMap::new(),
        payload,
        context: RequestContext::new(),
    }
}

pub(crate) fn slash_command_request(command: &str) -> SlackRequest {
    request(
        RequestKind::SlashCommand,
        json!({"command": command, "team_id": "T1"}),
    )
}

pub(crate) fn event_request(event: Value) -> SlackRequest {
    request(
        RequestKind::Event,
        json!({"type": "event_callback", "team_id": "T1", "event": event}),
    )
}
