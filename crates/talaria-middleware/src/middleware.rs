//! Core middleware trait and the chain continuation.
//!
//! A middleware receives the request, the current draft response, and a
//! [`Next`] continuation. It may short-circuit by returning without calling
//! `next`, mutate the request context before delegating, pass a mutated
//! draft downstream, or post-process the response on the way back out.
//!
//! # Example
//!
//! ```
//! use talaria_core::{AppResult, BoxFuture, Response, SlackRequest};
//! use talaria_middleware::{Middleware, Next};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn apply<'a>(
//!         &'a self,
//!         request: SlackRequest,
//!         draft: Response,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, AppResult<Response>> {
//!         Box::pin(async move {
//!             let started = std::time::Instant::now();
//!             let response = next.run(request, draft).await;
//!             tracing::debug!(elapsed = ?started.elapsed(), "request handled");
//!             response
//!         })
//!     }
//! }
//! ```

use talaria_core::{AppResult, BoxFuture, Response, SlackRequest};

/// One stage of the request pipeline.
pub trait Middleware: Send + Sync + 'static {
    /// Unique stage name, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request.
    ///
    /// Implementations MUST call `next.run` at most once; not calling it
    /// short-circuits the rest of the chain and the handler.
    fn apply<'a>(
        &'a self,
        request: SlackRequest,
        draft: Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, AppResult<Response>>;
}

/// The closure invoked when every middleware has delegated: the dispatcher.
pub type Terminal<'a> =
    Box<dyn FnOnce(SlackRequest) -> BoxFuture<'a, AppResult<Response>> + Send + 'a>;

/// Continuation over the remaining middleware chain.
///
/// Consumed by `run`, so a middleware can only continue the chain once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        rest: Box<Next<'a>>,
    },
    Terminal(Terminal<'a>),
}

impl<'a> Next<'a> {
    /// Wraps the continuation with one more middleware in front.
    #[must_use]
    pub fn new(middleware: &'a dyn Middleware, rest: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                rest: Box::new(rest),
            },
        }
    }

    /// The terminal continuation. The draft response is dropped here; the
    /// dispatcher produces the handler's own response.
    #[must_use]
    pub fn terminal(terminal: Terminal<'a>) -> Self {
        Self {
            inner: NextInner::Terminal(terminal),
        }
    }

    /// Invokes the next middleware, or the dispatcher at the end of the
    /// chain.
    pub async fn run(self, request: SlackRequest, draft: Response) -> AppResult<Response> {
        match self.inner {
            NextInner::Chain { middleware, rest } => {
                middleware.apply(request, draft, *rest).await
            }
            NextInner::Terminal(terminal) => terminal(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::slash_command_request;

    struct Tagging(&'static str);

    impl Middleware for Tagging {
        fn name(&self) -> &'static str {
            self.0
        }

        fn apply<'a>(
            &'a self,
            request: SlackRequest,
            mut draft: Response,
            next: Next<'a>,
        ) -> BoxFuture<'a, AppResult<Response>> {
            Box::pin(async move {
                draft.body.push_str(self.0);
                next.run(request, draft).await
            })
        }
    }

    #[tokio::test]
    async fn terminal_runs_without_middleware() {
        let next = Next::terminal(Box::new(|_req| {
            Box::pin(async { Ok(Response::plain(200, "handled")) })
        }));
        let response = next
            .run(slash_command_request("/ping"), Response::ok())
            .await
            .unwrap();
        assert_eq!(response.body, "handled");
    }

    /// Short-circuits by returning the draft it was handed.
    struct ReturnDraft;

    impl Middleware for ReturnDraft {
        fn name(&self) -> &'static str {
            "return-draft"
        }

        fn apply<'a>(
            &'a self,
            _request: SlackRequest,
            draft: Response,
            _next: Next<'a>,
        ) -> BoxFuture<'a, AppResult<Response>> {
            Box::pin(async move { Ok(draft) })
        }
    }

    #[tokio::test]
    async fn draft_mutations_flow_downstream() {
        let first = Tagging("a");
        let second = Tagging("b");
        let sink = ReturnDraft;
        let chain = Next::new(
            &first,
            Next::new(
                &second,
                Next::new(
                    &sink,
                    Next::terminal(Box::new(|_req| {
                        Box::pin(async { Ok(Response::plain(200, "unreached")) })
                    })),
                ),
            ),
        );
        let response = chain
            .run(slash_command_request("/ping"), Response::plain(200, ""))
            .await
            .unwrap();
        assert_eq!(response.body, "ab");
    }
}
