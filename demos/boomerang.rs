//! # Boomerang demo
//!
//! Twenty concurrent callers share one guard. Ids repeat (`evt0`..`evt4`), so
//! most calls are blocked as loopback or duplicate, and every admitted event
//! tries a nested `_nested` call that bounces off the reentrancy flag.
//!
//! ## Run
//! ```bash
//! cargo run --example boomerang
//! ```

use std::sync::Arc;

use boomguard::{Guard, GuardConfig, LogWriter, Subscribe};
use tokio_util::task::TaskTracker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let guard = Arc::new(
        Guard::builder(GuardConfig::default())
            .with_subscribers(subs)
            .build(),
    );

    let tracker = TaskTracker::new();
    for i in 0..20 {
        let guard = Arc::clone(&guard);
        tracker.spawn(async move {
            let event_id = format!("evt{}", i % 5);
            guard.process(&event_id, true).await
        });
    }
    tracker.close();
    tracker.wait().await;

    let snap = guard.snapshot().await;
    println!(
        "done: seen={} active_slots={} depth={}",
        snap.seen, snap.active_slots, snap.depth
    );

    guard.reset().await;

    let guard = Arc::try_unwrap(guard).map_err(|_| anyhow::anyhow!("guard still shared"))?;
    guard.shutdown().await;
    Ok(())
}
