//! Handler storage and lookup.
//!
//! Two lookup disciplines exist side by side. Events and outgoing webhooks
//! are exact-keyed maps; everything else is an ordered pattern list scanned
//! in insertion order, first full match wins. Re-registering an existing
//! key or pattern warns and replaces, so the later handler wins either way.

use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use talaria_core::SlackHandler;

/// One `(pattern, handler)` entry of a pattern-keyed slot.
struct PatternEntry {
    source: String,
    pattern: Regex,
    handler: Arc<dyn SlackHandler>,
}

/// Ordered pattern lookup: insertion order preserved, first full match wins.
#[derive(Default)]
pub(crate) struct PatternSlot {
    entries: Vec<PatternEntry>,
}

impl PatternSlot {
    /// Registers a bare string as the anchored pattern `^<literal>$`.
    pub(crate) fn insert_str(&mut self, key: &str, handler: Arc<dyn SlackHandler>) {
        match Regex::new(&format!("^{key}$")) {
            Ok(pattern) => self.insert(pattern, handler),
            Err(err) => warn!(key, error = %err, "ignoring an unregistrable handler key"),
        }
    }

    /// Registers a pre-compiled pattern. Matching is anchored to the whole
    /// key string, mirroring `Pattern.matches` semantics.
    pub(crate) fn insert(&mut self, pattern: Regex, handler: Arc<dyn SlackHandler>) {
        let source = pattern.as_str().to_string();
        let anchored = match Regex::new(&format!("^(?:{source})$")) {
            Ok(anchored) => anchored,
            Err(_) => pattern,
        };
        if let Some(existing) = self.entries.iter_mut().find(|e| e.source == source) {
            warn!(pattern = %source, "replaced the handler for an already-bound pattern");
            existing.handler = handler;
            return;
        }
        self.entries.push(PatternEntry {
            source,
            pattern: anchored,
            handler,
        });
    }

    /// Scans in insertion order for the first pattern matching `key`.
    pub(crate) fn find(&self, key: &str) -> Option<Arc<dyn SlackHandler>> {
        self.entries
            .iter()
            .find(|entry| entry.pattern.is_match(key))
            .map(|entry| Arc::clone(&entry.handler))
    }
}

/// Exact-string lookup for events and webhooks.
#[derive(Default)]
pub(crate) struct ExactSlot {
    entries: HashMap<String, Arc<dyn SlackHandler>>,
}

impl ExactSlot {
    pub(crate) fn insert(&mut self, key: String, handler: Arc<dyn SlackHandler>) {
        if self.entries.insert(key.clone(), handler).is_some() {
            warn!(key, "replaced the handler for an already-bound key");
        }
    }

    pub(crate) fn find(&self, key: &str) -> Option<Arc<dyn SlackHandler>> {
        self.entries.get(key).map(Arc::clone)
    }
}

/// All registered handlers, grouped by the kind they serve.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    pub(crate) events: ExactSlot,
    pub(crate) webhooks: ExactSlot,
    pub(crate) commands: PatternSlot,
    pub(crate) block_actions: PatternSlot,
    pub(crate) block_suggestions: PatternSlot,
    pub(crate) message_actions: PatternSlot,
    pub(crate) attachment_actions: PatternSlot,
    pub(crate) view_submissions: PatternSlot,
    pub(crate) view_closed: PatternSlot,
    pub(crate) dialog_submissions: PatternSlot,
    pub(crate) dialog_suggestions: PatternSlot,
    pub(crate) dialog_cancellations: PatternSlot,
}
