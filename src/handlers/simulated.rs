use std::time::Duration;

use async_trait::async_trait;

use super::handler::{EventContext, Handler};
use crate::config::SIMULATED_WORK_DELAY;

/// Default handler: stands in for real work by sleeping a fixed delay.
#[derive(Clone, Copy, Debug)]
pub struct SimulatedWork {
    delay: Duration,
}

impl SimulatedWork {
    /// Creates a handler sleeping `delay` per event.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedWork {
    fn default() -> Self {
        Self::new(SIMULATED_WORK_DELAY)
    }
}

#[async_trait]
impl Handler for SimulatedWork {
    async fn handle(&self, _ctx: &EventContext) {
        tokio::time::sleep(self.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn sleeps_configured_delay() {
        let work = SimulatedWork::default();
        assert_eq!(work.delay(), Duration::from_millis(100));

        let ctx = EventContext {
            event_id: Arc::from("evt"),
            depth: 1,
            thread: Arc::from("main"),
        };
        let start = tokio::time::Instant::now();
        work.handle(&ctx).await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
