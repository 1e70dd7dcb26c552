//! # Talaria Middleware
//!
//! The request pipeline: the [`Middleware`] trait, the [`Next`]
//! continuation, the [`run_chain`] executor, and the built-in stages under
//! [`stages`].
//!
//! Middlewares execute in insertion order on the way in and unwind in
//! reverse on the way out. A stage may short-circuit (not call `next`),
//! mutate the request context, alter the draft response seen downstream, or
//! post-process the returned response.

#![doc(html_root_url = "https://docs.rs/talaria-middleware/0.1.0")]
#![forbid(unsafe_code)]

mod chain;
mod middleware;
pub mod stages;
#[cfg(test)]
mod testing;

pub use chain::run_chain;
pub use middleware::{Middleware, Next, Terminal};
