//! # LogWriter: console printer for guard outcomes
//!
//! A minimal subscriber that prints every [`Event`] with a fixed tag.
//! Admissions go to stdout, rejections to stderr.
//!
//! ## Example output
//! ```text
//! [handled] evt0 depth=1 thread=ThreadId(3)
//! [blocked:loopback] evt0_nested
//! [blocked:duplicate] evt0
//! [blocked:overload] evt4 reason="thread overload: 16/16 slots in use"
//! [blocked:recursion-limit] evt2 depth=10
//! [reset] state cleared
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Console writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn or_unknown(v: &Option<std::sync::Arc<str>>) -> &str {
    v.as_deref().unwrap_or("?")
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let id = or_unknown(&e.event_id);
        match e.kind {
            EventKind::Handled => {
                println!(
                    "[handled] {id} depth={} thread={}",
                    e.depth.unwrap_or(0),
                    or_unknown(&e.thread)
                );
            }
            EventKind::Completed => {}
            EventKind::Overload => {
                eprintln!("[blocked:overload] {id} reason={:?}", or_unknown(&e.reason));
            }
            EventKind::RecursionLimit => {
                eprintln!(
                    "[blocked:recursion-limit] {id} depth={}",
                    e.depth.unwrap_or(0)
                );
            }
            EventKind::Loopback => {
                eprintln!("[blocked:loopback] {id}");
            }
            EventKind::Duplicate => {
                eprintln!("[blocked:duplicate] {id}");
            }
            EventKind::Reset => {
                println!("[reset] state cleared");
            }
            EventKind::SubscriberOverflow => {
                eprintln!(
                    "[subscriber-overflow] subscriber={id} reason={}",
                    or_unknown(&e.reason)
                );
            }
            EventKind::SubscriberPanicked => {
                eprintln!(
                    "[subscriber-panicked] subscriber={id} info={}",
                    or_unknown(&e.reason)
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
