//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(EventContext) -> Fut`, producing a fresh
//! future per admitted event. Shared state must be captured explicitly (e.g. `Arc<...>`).
//!
//! ## Example
//! ```rust
//! use boomguard::{EventContext, HandlerFn, HandlerRef};
//!
//! let h: HandlerRef = HandlerFn::arc(|ctx: EventContext| async move {
//!     println!("handling {}", ctx.event_id);
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::handler::{EventContext, Handler};

/// Function-backed handler implementation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(EventContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, ctx: &EventContext) {
        (self.f)(ctx.clone()).await;
    }
}
