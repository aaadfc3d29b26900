//! # Handler abstraction.
//!
//! The [`Handler`] trait is the business logic the guard wraps. It is invoked
//! only after a call passes every admission check, outside any guard lock.
//! The common handle type is [`HandlerRef`], an `Arc<dyn Handler>`.

use std::sync::Arc;

use async_trait::async_trait;

/// Per-admission context passed to a [`Handler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    /// Id of the admitted event.
    pub event_id: Arc<str>,
    /// Shared recursion depth right after this call's commit.
    pub depth: usize,
    /// Label of the worker thread running the body.
    pub thread: Arc<str>,
}

/// # Business logic run for an admitted event.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use boomguard::{EventContext, Handler};
///
/// struct Print;
///
/// #[async_trait]
/// impl Handler for Print {
///     async fn handle(&self, ctx: &EventContext) {
///         println!("{} at depth {}", ctx.event_id, ctx.depth);
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Runs the body for one admitted event.
    ///
    /// A panic propagates to the caller; the guard rolls back its state while it unwinds.
    async fn handle(&self, ctx: &EventContext);
}

/// Shared handle to a handler object.
pub type HandlerRef = Arc<dyn Handler>;
