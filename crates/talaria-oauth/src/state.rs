//! Install-state issuance and consumption.
//!
//! The install state is the one-time anti-CSRF token threaded through the
//! OAuth consent redirect. `issue` mints a state and may decorate the draft
//! response (the default store mirrors bolt and sets a cookie alongside the
//! server-side record); `consume` must be atomic and single-use: of two
//! callbacks racing on the same state, at most one wins.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use talaria_core::{BoxFuture, Response, SlackRequest};

use crate::error::StoreError;

/// Cookie the default store attaches to the install-start response.
pub const STATE_COOKIE_NAME: &str = "slack-app-oauth-state";

/// Issues and consumes one-time install-state tokens.
pub trait OAuthStateStore: Send + Sync {
    /// Issues a fresh state for an install-start request.
    ///
    /// The store may mutate the draft response, e.g. to attach a
    /// `Set-Cookie` header.
    fn issue<'a>(
        &'a self,
        request: &'a SlackRequest,
        draft: &'a mut Response,
    ) -> BoxFuture<'a, Result<String, StoreError>>;

    /// Consumes a state, returning whether it was valid.
    ///
    /// Returns `true` at most once per issued state, under any concurrency.
    fn consume<'a>(&'a self, state: &'a str) -> BoxFuture<'a, bool>;
}

/// In-memory state store, the default.
///
/// States are UUID v4 tokens held server-side with their expiry; the mutex
/// makes remove-on-consume atomic.
#[derive(Debug)]
pub struct MemoryOAuthStateStore {
    states: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl MemoryOAuthStateStore {
    /// Creates a store with the given state TTL in seconds.
    #[must_use]
    pub fn new(expiration_seconds: u64) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            ttl: Duration::from_secs(expiration_seconds),
        }
    }
}

impl Default for MemoryOAuthStateStore {
    fn default() -> Self {
        Self::new(talaria_core::DEFAULT_STATE_EXPIRATION_SECONDS)
    }
}

impl OAuthStateStore for MemoryOAuthStateStore {
    fn issue<'a>(
        &'a self,
        _request: &'a SlackRequest,
        draft: &'a mut Response,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        Box::pin(async move {
            let state = Uuid::new_v4().to_string();
            let expires_at = Instant::now() + self.ttl;
            {
                let mut states = self.states.lock();
                states.retain(|_, expiry| *expiry > Instant::now());
                states.insert(state.clone(), expires_at);
            }
            draft.add_cookie(&format!(
                "{STATE_COOKIE_NAME}={state}; Secure; HttpOnly; Max-Age={}",
                self.ttl.as_secs()
            ));
            Ok(state)
        })
    }

    fn consume<'a>(&'a self, state: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            match self.states.lock().remove(state) {
                Some(expires_at) => expires_at > Instant::now(),
                None => false,
            }
        })
    }
}
