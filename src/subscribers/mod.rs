//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in console [`LogWriter`] (feature `logging`).
//!
//! ```text
//! Guard ── publish(Event) ──► Bus ──► listener ──► SubscriberSet ──┬──► LogWriter
//!                              ▲                                   └──► custom Subscribe impls
//!                              └── SubscriberOverflow / SubscriberPanicked
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
