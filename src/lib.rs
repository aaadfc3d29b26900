//! # boomguard
//!
//! **boomguard** is a reentrancy and overload guard for event handlers.
//!
//! A [`Guard`] sits in front of an arbitrary [`Handler`] and decides, for every
//! incoming event id, whether the handler may run. It protects against
//! feedback loops ("boomerangs": an event re-triggering itself directly or
//! through nested processing) and against unbounded concurrent or recursive
//! invocation.
//!
//! ## Architecture
//! ```text
//!   caller ──► Guard::try_process(id, allow_nested)
//!                 │
//!                 ├─ 1. slot gate ───────────► Overload
//!                 ├─ 2. depth check ─────────► RecursionLimit
//!                 ├─ 3. loopback / duplicate ► Loopback | Duplicate
//!                 ├─ 4. Handler::handle(ctx)  (+ optional nested try_process)
//!                 ├─ 5. rollback
//!                 └─ 6. slot release
//!                 │
//!                 └─ publish(Event) ──► Bus ──► SubscriberSet ──► LogWriter, custom...
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types / traits                     |
//! |-------------------|---------------------------------------------------------|----------------------------------------|
//! | **Guard**         | Ordered admission checks, rollback on every exit path.  | [`Guard`], [`GuardBuilder`]            |
//! | **Outcomes**      | Typed rejection kinds.                                  | [`Rejection`]                          |
//! | **Handlers**      | Work run for admitted events.                           | [`Handler`], [`HandlerFn`], [`SimulatedWork`] |
//! | **Events**        | Every outcome is published on a broadcast bus.          | [`Event`], [`EventKind`]               |
//! | **Subscribers**   | Isolated fan-out of events to observers.                | [`Subscribe`], [`SubscriberSet`]       |
//! | **Configuration** | Named limits and their defaults.                        | [`GuardConfig`]                        |
//!
//! ## Optional features
//! - `logging` (default): exports the console [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use boomguard::{Guard, GuardConfig, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = GuardConfig { work_delay: Duration::from_millis(1), ..GuardConfig::default() };
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(boomguard::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let guard = Guard::builder(cfg).with_subscribers(subs).build();
//!
//!     assert!(guard.process("evt0", true).await);
//!     assert!(!guard.process("evt0", true).await);
//!
//!     guard.shutdown().await;
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod handlers;
mod subscribers;

// ---- Public re-exports ----

pub use config::{
    DEFAULT_BUS_CAPACITY, GuardConfig, MAX_CONCURRENT_SLOTS, MAX_RECURSION_DEPTH, NESTED_SUFFIX,
    NESTED_TRIGGER_DEPTH, SIMULATED_WORK_DELAY,
};
pub use self::core::{Guard, GuardBuilder, GuardSnapshot};
pub use error::Rejection;
pub use events::{Event, EventKind};
pub use handlers::{EventContext, Handler, HandlerFn, HandlerRef, SimulatedWork};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in console subscriber.
// Enabled by default; disable with `--no-default-features`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
