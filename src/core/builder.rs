use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::guard::Guard;
use crate::{
    config::GuardConfig,
    events::Bus,
    handlers::{HandlerRef, SimulatedWork},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Guard`] with subscribers and a custom handler.
pub struct GuardBuilder {
    cfg: GuardConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    handler: Option<HandlerRef>,
}

impl GuardBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: GuardConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            handler: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive every outcome through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the handler run for admitted events.
    ///
    /// Defaults to [`SimulatedWork`] sleeping [`GuardConfig::work_delay`].
    pub fn with_handler(mut self, handler: HandlerRef) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Builds the guard.
    ///
    /// Must be called from within a tokio runtime when subscribers are set
    /// (a listener and one worker per subscriber are spawned).
    pub fn build(self) -> Guard {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let token = CancellationToken::new();
        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            Some(subscriber_listener(&bus, subs, token.clone()))
        };
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(SimulatedWork::new(self.cfg.work_delay)));

        Guard::new_internal(self.cfg, bus, handler, listener, token)
    }
}

/// Forwards bus events (guard outcomes and subscriber failures alike) to the set.
///
/// On cancellation, events already on the bus are forwarded before the set drains.
fn subscriber_listener(
    bus: &Bus,
    subs: SubscriberSet,
    token: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        while let Some(res) = token.run_until_cancelled(rx.recv()).await {
            match res {
                Ok(ev) => subs.emit(&ev),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => subs.emit(&ev),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        subs.shutdown().await;
    })
}
