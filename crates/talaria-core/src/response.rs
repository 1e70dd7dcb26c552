//! The HTTP response record returned to the adapter.
//!
//! A [`Response`] is deliberately dumb: a status code, multi-valued headers,
//! a content type, and a textual body. The hosting HTTP server translates it
//! into whatever wire representation it uses. A draft `Response::ok()` is
//! seeded into the middleware chain before any middleware runs; stages may
//! mutate or replace it on the way through.

use http::header::{HeaderName, HeaderValue, LOCATION, SET_COOKIE};
use http::HeaderMap;

/// Content type used by [`Response::ok`] and [`Response::plain`].
pub const TEXT_PLAIN: &str = "text/plain";

/// Content type used by [`Response::json`].
pub const APPLICATION_JSON: &str = "application/json";

/// An HTTP response produced by the framework or a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers. Multi-valued; `Set-Cookie` may appear repeatedly.
    pub headers: HeaderMap,
    /// Value for the `Content-Type` header.
    pub content_type: String,
    /// Response body.
    pub body: String,
}

impl Response {
    /// Creates an empty response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content_type: TEXT_PLAIN.to_string(),
            body: String::new(),
        }
    }

    /// The conventional acknowledgement: `200 text/plain` with body `[]`.
    #[must_use]
    pub fn ok() -> Self {
        Self::plain(200, "[]")
    }

    /// A plain-text response.
    #[must_use]
    pub fn plain(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content_type: TEXT_PLAIN.to_string(),
            body: body.into(),
        }
    }

    /// A JSON response. The caller supplies an already-serialized body.
    #[must_use]
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content_type: APPLICATION_JSON.to_string(),
            body: body.into(),
        }
    }

    /// A `302` redirect to the given URL.
    #[must_use]
    pub fn redirect(url: &str) -> Self {
        let mut response = Self::new(302);
        response.set_location(url);
        response
    }

    /// Sets (replacing) the `Location` header.
    pub fn set_location(&mut self, url: &str) {
        if let Ok(value) = HeaderValue::from_str(url) {
            self.headers.insert(LOCATION, value);
        }
    }

    /// Returns the `Location` header, if set.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Appends a header value, keeping existing values for the same name.
    pub fn append_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
    }

    /// Appends a `Set-Cookie` header.
    pub fn add_cookie(&mut self, cookie: &str) {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            self.headers.append(SET_COOKIE, value);
        }
    }
}
