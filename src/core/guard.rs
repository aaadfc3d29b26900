//! # Guard: admission checks around an event handler.
//!
//! The [`Guard`] owns the slot counter, the shared recursion depth, the
//! seen-event set and the reentrancy flag. Every call to
//! [`Guard::try_process`] runs the same fixed sequence:
//!
//! ```text
//! try_process(id, allow_nested)
//!   │
//!   ├─ 1. slot gate (lock)        active >= max_concurrent ─► Overload        (no slot taken)
//!   ├─ 2. depth check (atomic)    depth  >= max_depth      ─► RecursionLimit  (slot released)
//!   ├─ 3. ledger (lock)           updating                 ─► Loopback        (slot released)
//!   │                             id in seen-set           ─► Duplicate       (slot released)
//!   │                             else: insert id, updating = true, depth += 1
//!   ├─ 4. body (no lock)          publish Handled, handler.handle(ctx)
//!   │                             allow_nested && depth < nested_trigger_depth
//!   │                                 └─► try_process(id + suffix, false)
//!   ├─ 5. rollback (Commit drop)  updating = false, depth -= 1, publish Completed
//!   └─ 6. slot release            SlotPermit dropped
//! ```
//!
//! ## Rules
//! - Locks are held only across check-then-mutate, never across the handler.
//! - Rollback and slot release are scope-bound: they run on return, on a panicking
//!   handler and when the caller drops the future mid-body (timeout, `select!`, abort).
//! - Depth is instance-wide: all concurrent calls on one guard share it.
//! - `reset()` never touches the slot counter.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use boomguard::{Guard, GuardConfig, Rejection};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = GuardConfig { work_delay: Duration::from_millis(1), ..GuardConfig::default() };
//!     let guard = Guard::new(cfg);
//!
//!     assert!(guard.process("evt", false).await);
//!     assert_eq!(guard.try_process("evt", false).await, Err(Rejection::Duplicate));
//!
//!     guard.reset().await;
//!     assert!(guard.process("evt", false).await);
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{builder::GuardBuilder, ledger::Ledger, slots::SlotCounter};
use crate::{
    config::GuardConfig,
    error::Rejection,
    events::{Bus, Event, EventKind},
    handlers::{EventContext, HandlerRef},
};

/// Point-in-time view of a guard's shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardSnapshot {
    /// Calls currently holding an admission slot.
    pub active_slots: usize,
    /// Shared recursion depth.
    pub depth: usize,
    /// Whether a call is inside the guarded body.
    pub updating: bool,
    /// Number of ids recorded since the last reset.
    pub seen: usize,
}

/// Reentrancy and overload guard.
pub struct Guard {
    cfg: GuardConfig,
    bus: Bus,
    handler: HandlerRef,

    slots: SlotCounter,
    depth: AtomicUsize,
    // Never held across an await, so `Commit::drop` can take it synchronously.
    ledger: Mutex<Ledger>,

    listener: Option<JoinHandle<()>>,
    listener_token: CancellationToken,
}

/// Committed admission. Dropping it clears the reentrancy flag and
/// decrements the depth, whether the body returned, panicked or was cancelled.
struct Commit<'a> {
    guard: &'a Guard,
    event_id: Arc<str>,
}

impl Drop for Commit<'_> {
    fn drop(&mut self) {
        let depth = {
            let mut ledger = self.guard.lock_ledger();
            ledger.release();
            self.guard.decrement_depth()
        };
        self.guard.emit(
            Event::new(EventKind::Completed)
                .with_event_id(Arc::clone(&self.event_id))
                .with_depth(depth),
        );
    }
}

impl Guard {
    /// Creates a guard with the default [`SimulatedWork`](crate::SimulatedWork) handler and no subscribers.
    pub fn new(cfg: GuardConfig) -> Self {
        GuardBuilder::new(cfg).build()
    }

    /// Returns a builder for configuring subscribers and the handler.
    pub fn builder(cfg: GuardConfig) -> GuardBuilder {
        GuardBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: GuardConfig,
        bus: Bus,
        handler: HandlerRef,
        listener: Option<JoinHandle<()>>,
        listener_token: CancellationToken,
    ) -> Self {
        let slots = SlotCounter::new(cfg.max_concurrent);
        Self {
            cfg,
            bus,
            handler,
            slots,
            depth: AtomicUsize::new(0),
            ledger: Mutex::new(Ledger::default()),
            listener,
            listener_token,
        }
    }

    /// Attempts to admit and run one event. Returns `true` if it was handled.
    ///
    /// `allow_nested` controls whether the body may issue its nested call;
    /// nested calls themselves always pass `false`.
    pub async fn process(&self, event_id: &str, allow_nested: bool) -> bool {
        self.try_process(event_id, allow_nested).await.is_ok()
    }

    /// Attempts to admit and run one event, reporting why it was rejected.
    ///
    /// A rejection is an expected outcome, not a fault; nothing is retried.
    /// Dropping the returned future mid-body rolls the admission back.
    ///
    /// # Panics
    /// Propagates a panic raised by the handler, after the guard state has been rolled back.
    pub fn try_process<'a>(
        &'a self,
        event_id: &'a str,
        allow_nested: bool,
    ) -> BoxFuture<'a, Result<(), Rejection>> {
        async move {
            let _slot = match self.slots.try_acquire().await {
                Ok(permit) => permit,
                Err(rejection) => return Err(self.rejected(event_id, rejection)),
            };

            let depth = self.depth.load(Ordering::Acquire);
            if depth >= self.cfg.max_depth {
                let rejection = Rejection::RecursionLimit {
                    depth,
                    limit: self.cfg.max_depth,
                };
                return Err(self.rejected(event_id, rejection));
            }

            let (commit, depth) = match self.commit(event_id) {
                Ok(committed) => committed,
                Err(rejection) => return Err(self.rejected(event_id, rejection)),
            };

            let ctx = EventContext {
                event_id: Arc::clone(&commit.event_id),
                depth,
                thread: Arc::from(format!("{:?}", std::thread::current().id())),
            };
            self.emit(
                Event::new(EventKind::Handled)
                    .with_event_id(Arc::clone(&ctx.event_id))
                    .with_depth(depth)
                    .with_thread(Arc::clone(&ctx.thread)),
            );

            self.run_body(&ctx, allow_nested).await;

            // Rollback before the slot permit goes.
            drop(commit);
            Ok(())
        }
        .boxed()
    }

    /// Loopback/duplicate check plus commit, atomically under the ledger lock.
    fn commit(&self, event_id: &str) -> Result<(Commit<'_>, usize), Rejection> {
        let mut ledger = self.lock_ledger();
        ledger.commit(event_id)?;
        let depth = self.depth.fetch_add(1, Ordering::AcqRel) + 1;
        let commit = Commit {
            guard: self,
            event_id: Arc::from(event_id),
        };
        Ok((commit, depth))
    }

    /// Runs the handler, then the optional nested self-call.
    async fn run_body(&self, ctx: &EventContext, allow_nested: bool) {
        self.handler.handle(ctx).await;

        if allow_nested && self.depth.load(Ordering::Acquire) < self.cfg.nested_trigger_depth {
            let nested = self.cfg.nested_id(&ctx.event_id);
            // The child's outcome is reported on the bus; the parent is handled either way.
            let _ = self.try_process(&nested, false).await;
        }
    }

    /// Clears the seen-set and reentrancy flag and zeroes the depth.
    ///
    /// The slot counter is left alone: it reflects calls genuinely in flight.
    pub async fn reset(&self) {
        {
            let mut ledger = self.lock_ledger();
            self.depth.store(0, Ordering::Release);
            ledger.clear();
        }
        self.emit(Event::new(EventKind::Reset));
    }

    /// A panic never happens while the ledger is held, so a poisoned lock still holds consistent state.
    fn lock_ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saturating decrement; a `reset` during an in-flight body may already have zeroed the depth.
    fn decrement_depth(&self) -> usize {
        let prev = self
            .depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| {
                Some(d.saturating_sub(1))
            })
            .unwrap_or(0);
        prev.saturating_sub(1)
    }

    fn rejected(&self, event_id: &str, rejection: Rejection) -> Rejection {
        let mut ev = Event::new(rejection.event_kind())
            .with_event_id(event_id)
            .with_reason(rejection.to_string());
        if let Rejection::RecursionLimit { depth, .. } = rejection {
            ev = ev.with_depth(depth);
        }
        self.emit(ev);
        rejection
    }

    fn emit(&self, ev: Event) {
        self.bus.publish(ev);
    }

    /// Creates a receiver observing every subsequent event of this guard.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Calls currently holding an admission slot.
    pub fn active_slots(&self) -> usize {
        self.slots.active()
    }

    /// Current shared recursion depth.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Returns `true` if `event_id` was handled since the last reset.
    pub async fn has_seen(&self, event_id: &str) -> bool {
        self.lock_ledger().has_seen(event_id)
    }

    /// Consistent view of depth, flag and seen-set (slot count read alongside).
    pub async fn snapshot(&self) -> GuardSnapshot {
        let ledger = self.lock_ledger();
        GuardSnapshot {
            active_slots: self.slots.active(),
            depth: self.depth.load(Ordering::Acquire),
            updating: ledger.is_updating(),
            seen: ledger.seen_len(),
        }
    }

    /// Configuration this guard was built with.
    pub fn config(&self) -> &GuardConfig {
        &self.cfg
    }

    /// Stops the subscriber listener after it has forwarded pending events,
    /// then waits for subscriber queues to drain.
    pub async fn shutdown(mut self) {
        self.listener_token.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        self.listener_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::handlers::HandlerFn;
    use crate::subscribers::Subscribe;

    fn fast(delay_ms: u64) -> GuardConfig {
        GuardConfig {
            work_delay: Duration::from_millis(delay_ms),
            ..GuardConfig::default()
        }
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind, id: &str) {
        loop {
            let ev = rx.recv().await.expect("bus closed");
            if ev.kind == kind && ev.event_id.as_deref() == Some(id) {
                return;
            }
        }
    }

    #[tokio::test]
    async fn reset_clears_duplicate_history() {
        let guard = Guard::new(fast(1));

        assert!(guard.process("x", false).await);
        assert_eq!(
            guard.try_process("x", false).await,
            Err(Rejection::Duplicate)
        );

        guard.reset().await;
        assert!(guard.process("x", false).await);
        assert_eq!(guard.active_slots(), 0);
    }

    #[tokio::test]
    async fn nested_call_is_rejected_as_loopback() {
        let guard = Guard::new(fast(5));
        let mut rx = guard.subscribe();

        assert!(guard.process("evt", true).await);

        let events = drain(&mut rx);
        let summary: Vec<_> = events
            .iter()
            .map(|e| (e.kind, e.event_id.as_deref().unwrap_or_default()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (EventKind::Handled, "evt"),
                (EventKind::Loopback, "evt_nested"),
                (EventKind::Completed, "evt"),
            ]
        );
        assert_eq!(events[0].depth, Some(1));

        assert!(guard.has_seen("evt").await);
        assert!(!guard.has_seen("evt_nested").await);
        assert!(guard.process("evt_nested", true).await);
    }

    #[tokio::test]
    async fn nested_call_is_skipped_when_disallowed() {
        let guard = Guard::new(fast(1));
        let mut rx = guard.subscribe();

        assert!(guard.process("evt", false).await);

        let kinds: Vec<_> = drain(&mut rx).into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Handled, EventKind::Completed]);
    }

    #[tokio::test]
    async fn nested_call_respects_trigger_depth() {
        let cfg = GuardConfig {
            nested_trigger_depth: 1,
            ..fast(1)
        };
        let guard = Guard::new(cfg);
        let mut rx = guard.subscribe();

        assert!(guard.process("evt", true).await);
        assert!(
            drain(&mut rx)
                .iter()
                .all(|e| e.event_id.as_deref() == Some("evt"))
        );
    }

    #[tokio::test]
    async fn recursion_limit_hits_at_boundary_not_before() {
        let guard = Guard::new(GuardConfig {
            max_depth: 1,
            ..fast(1)
        });
        let mut rx = guard.subscribe();
        assert!(guard.process("a", true).await);
        let nested = drain(&mut rx)
            .into_iter()
            .find(|e| e.event_id.as_deref() == Some("a_nested"))
            .expect("nested attempt");
        assert_eq!(nested.kind, EventKind::RecursionLimit);
        assert_eq!(nested.depth, Some(1));

        let guard = Guard::new(GuardConfig {
            max_depth: 2,
            ..fast(1)
        });
        let mut rx = guard.subscribe();
        assert!(guard.process("a", true).await);
        let nested = drain(&mut rx)
            .into_iter()
            .find(|e| e.event_id.as_deref() == Some("a_nested"))
            .expect("nested attempt");
        assert_eq!(nested.kind, EventKind::Loopback);
    }

    #[tokio::test]
    async fn recursion_limit_releases_slot() {
        let guard = Guard::new(GuardConfig {
            max_depth: 0,
            ..fast(1)
        });

        let err = guard.try_process("a", false).await.expect_err("rejected");
        assert_eq!(err, Rejection::RecursionLimit { depth: 0, limit: 0 });
        assert_eq!(guard.active_slots(), 0);
        assert!(!guard.has_seen("a").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overload_rejects_while_slots_are_held() {
        let guard = Arc::new(Guard::new(GuardConfig {
            max_concurrent: 1,
            ..fast(200)
        }));
        let mut rx = guard.subscribe();

        let holder = {
            let g = Arc::clone(&guard);
            tokio::spawn(async move { g.process("hold", false).await })
        };
        wait_for(&mut rx, EventKind::Handled, "hold").await;

        for i in 0..3 {
            let id = format!("x{i}");
            assert_eq!(
                guard.try_process(&id, false).await,
                Err(Rejection::Overload { active: 1, limit: 1 })
            );
        }
        assert_eq!(guard.active_slots(), 1);

        assert!(holder.await.expect("join"));
        assert_eq!(guard.active_slots(), 0);
        assert!(!guard.has_seen("x0").await);
        assert!(guard.process("x0", false).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_same_id_has_one_winner() {
        let guard = Arc::new(Guard::new(fast(50)));
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let g = Arc::clone(&guard);
            let b = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                b.wait().await;
                g.try_process("x", false).await
            }));
        }

        let mut wins = 0;
        for h in handles {
            match h.await.expect("join") {
                Ok(()) => wins += 1,
                Err(r) => assert!(matches!(r, Rejection::Loopback | Rejection::Duplicate)),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(
            guard.try_process("x", false).await,
            Err(Rejection::Duplicate)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn slots_and_depth_return_to_zero() {
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let handler = {
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            HandlerFn::arc(move |_ctx: EventContext| {
                let inside = Arc::clone(&inside);
                let peak = Arc::clone(&peak);
                async move {
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            })
        };
        let guard = Arc::new(Guard::builder(fast(10)).with_handler(handler).build());

        let mut handles = Vec::new();
        for i in 0..20 {
            let g = Arc::clone(&guard);
            handles.push(tokio::spawn(async move {
                let id = format!("evt{}", i % 5);
                let res = g.try_process(&id, true).await;
                (id, res)
            }));
        }

        let mut wins: HashMap<String, usize> = HashMap::new();
        for h in handles {
            let (id, res) = h.await.expect("join");
            if res.is_ok() {
                *wins.entry(id).or_default() += 1;
            }
        }

        assert!(!wins.is_empty());
        assert!(wins.values().all(|n| *n == 1));
        assert!(peak.load(Ordering::SeqCst) <= guard.config().max_concurrent);
        assert_eq!(peak.load(Ordering::SeqCst), 1);

        let snap = guard.snapshot().await;
        assert_eq!(snap.active_slots, 0);
        assert_eq!(snap.depth, 0);
        assert!(!snap.updating);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reset_leaves_in_flight_slots_alone() {
        let guard = Arc::new(Guard::new(fast(100)));
        let mut rx = guard.subscribe();

        let holder = {
            let g = Arc::clone(&guard);
            tokio::spawn(async move { g.process("hold", false).await })
        };
        wait_for(&mut rx, EventKind::Handled, "hold").await;

        guard.reset().await;
        let snap = guard.snapshot().await;
        assert_eq!(snap.active_slots, 1);
        assert_eq!(snap.depth, 0);
        assert!(!snap.updating);
        assert_eq!(snap.seen, 0);

        assert!(holder.await.expect("join"));
        assert_eq!(guard.active_slots(), 0);
        assert_eq!(guard.depth(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_handler_rolls_back() {
        let handler = HandlerFn::arc(|ctx: EventContext| async move {
            if &*ctx.event_id == "bad" {
                panic!("handler failed");
            }
        });
        let guard = Arc::new(Guard::builder(fast(1)).with_handler(handler).build());

        let g = Arc::clone(&guard);
        let joined = tokio::spawn(async move { g.process("bad", false).await }).await;
        assert!(joined.expect_err("panicked").is_panic());

        let snap = guard.snapshot().await;
        assert_eq!(snap.active_slots, 0);
        assert_eq!(snap.depth, 0);
        assert!(!snap.updating);

        assert_eq!(
            guard.try_process("bad", false).await,
            Err(Rejection::Duplicate)
        );
        assert!(guard.process("good", false).await);
    }

    #[tokio::test]
    async fn timed_out_call_rolls_back() {
        let guard = Guard::new(fast(200));

        let res = tokio::time::timeout(Duration::from_millis(20), guard.process("a", false)).await;
        assert!(res.is_err());

        let snap = guard.snapshot().await;
        assert_eq!(
            snap,
            GuardSnapshot {
                active_slots: 0,
                depth: 0,
                updating: false,
                seen: 1,
            }
        );
        assert_eq!(guard.try_process("a", false).await, Err(Rejection::Duplicate));
        assert!(guard.process("b", false).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn aborted_call_rolls_back() {
        let guard = Arc::new(Guard::new(fast(500)));
        let mut rx = guard.subscribe();

        let task = {
            let g = Arc::clone(&guard);
            tokio::spawn(async move { g.process("a", true).await })
        };
        wait_for(&mut rx, EventKind::Handled, "a").await;

        task.abort();
        assert!(task.await.expect_err("aborted").is_cancelled());
        wait_for(&mut rx, EventKind::Completed, "a").await;

        let snap = guard.snapshot().await;
        assert_eq!(snap.active_slots, 0);
        assert_eq!(snap.depth, 0);
        assert!(!snap.updating);
    }

    #[derive(Default)]
    struct Recorder(std::sync::Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().expect("recorder lock").push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Faulty;

    #[async_trait]
    impl Subscribe for Faulty {
        async fn on_event(&self, _ev: &Event) {
            panic!("faulty subscriber");
        }

        fn name(&self) -> &'static str {
            "faulty"
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn subscriber_failures_reach_other_subscribers() {
        let recorder = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone(), Arc::new(Faulty)];
        let guard = Guard::builder(fast(1)).with_subscribers(subs).build();
        let mut rx = guard.subscribe();

        assert!(guard.process("x", false).await);
        wait_for(&mut rx, EventKind::SubscriberPanicked, "faulty").await;
        guard.shutdown().await;

        let seen = recorder.0.lock().expect("recorder lock").clone();
        assert!(seen.contains(&EventKind::Handled));
        assert!(seen.contains(&EventKind::Completed));
        assert!(seen.contains(&EventKind::SubscriberPanicked));
    }
}
