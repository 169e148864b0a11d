use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::coalesce::{Coalescer, DEFAULT_BURST_THRESHOLD};
use crate::dispatch::{Dispatcher, ScanRunner};
use crate::epoch::EpochTracker;
use crate::error::{BridgeError, Result};
use crate::events::{Cursor, EventPoller};
use crate::mapper::FolderMap;
use crate::queue::ScanQueue;
use crate::transport::Transport;

/// Tuning knobs for the bridge loop.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Delay before resuming after a transient failure.
    pub backoff: Duration,
    /// How often the dispatcher re-checks an empty queue.
    pub idle_poll: Duration,
    /// Consecutive same-parent events before a burst collapses.
    pub burst_threshold: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
            idle_poll: Duration::from_secs(5),
            burst_threshold: DEFAULT_BURST_THRESHOLD,
        }
    }
}

/// Owns every moving part of the bridge: epoch tracker, event poller,
/// coalescer, the shared queue, and the dispatcher task.
///
/// Fatal conditions (rejected API key, failed scan) surface as the error
/// returned from [`run`](Bridge::run); everything else is ridden out with
/// a backoff while the queue and the dispatcher keep working.
pub struct Bridge {
    config: BridgeConfig,
    tracker: EpochTracker,
    poller: EventPoller,
    coalescer: Coalescer,
    queue: Arc<Mutex<ScanQueue>>,
    runner: Arc<dyn ScanRunner>,
    cursor: Cursor,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl Bridge {
    pub fn new(
        transport: Arc<dyn Transport>,
        mapper: FolderMap,
        runner: Arc<dyn ScanRunner>,
        config: BridgeConfig,
    ) -> Self {
        let coalescer = Coalescer::with_threshold(mapper, config.burst_threshold);
        Self {
            tracker: EpochTracker::new(transport.clone()),
            poller: EventPoller::new(transport),
            coalescer,
            queue: Arc::new(Mutex::new(ScanQueue::new())),
            runner,
            cursor: 0,
            config,
        }
    }

    /// Shared handle to the pending-scan queue.
    pub fn queue(&self) -> Arc<Mutex<ScanQueue>> {
        self.queue.clone()
    }

    /// Run until a fatal error.
    ///
    /// The dispatcher task is spawned here and owned here: when it dies,
    /// the bridge returns its error; when the poll side hits something
    /// fatal, the dispatcher is aborted on the way out.
    pub async fn run(mut self) -> Result<()> {
        let dispatcher = Dispatcher::new(
            self.queue.clone(),
            self.runner.clone(),
            self.config.idle_poll,
        );
        let mut dispatch_task = tokio::spawn(dispatcher.run());

        let result = tokio::select! {
            res = self.poll_loop() => res,
            res = &mut dispatch_task => match res {
                Ok(inner) => inner,
                Err(join_err) => Err(BridgeError::Internal(format!(
                    "dispatcher task failed: {join_err}"
                ))),
            },
        };
        dispatch_task.abort();
        result
    }

    /// Flat connect -> poll -> backoff state machine.
    ///
    /// Every pass re-establishes the daemon's epoch first, so the cursor
    /// rewinds to zero on a detected restart; that covers startup and
    /// every recovery after a transient failure. Deliberately, a restart
    /// does not clear the queue: already-coalesced paths still describe
    /// directories worth scanning, and scans are idempotent.
    async fn poll_loop(&mut self) -> Result<()> {
        loop {
            match self.tracker.observe().await {
                Ok(true) => {
                    if self.cursor != 0 {
                        info!(cursor = self.cursor, "daemon epoch changed, rewinding cursor");
                    }
                    self.cursor = 0;
                }
                Ok(false) => {}
                Err(err) if !err.is_fatal() => {
                    warn!(
                        error = %err,
                        backoff_secs = self.config.backoff.as_secs_f32(),
                        "status check failed, backing off"
                    );
                    tokio::time::sleep(self.config.backoff).await;
                    continue;
                }
                Err(err) => return Err(err),
            }

            info!(cursor = self.cursor, "polling for events");
            loop {
                match self.poller.poll(self.cursor).await {
                    Ok(batch) => {
                        self.cursor = batch.cursor;
                        if batch.events.is_empty() {
                            continue;
                        }
                        let mut queue = self.queue.lock().await;
                        let enqueued = self.coalescer.apply(&mut queue, &batch.events);
                        info!(
                            events = batch.events.len(),
                            enqueued,
                            queued = queue.len(),
                            cursor = self.cursor,
                            "change batch coalesced"
                        );
                    }
                    Err(err) if !err.is_fatal() => {
                        warn!(
                            error = %err,
                            backoff_secs = self.config.backoff.as_secs_f32(),
                            "event poll failed, backing off"
                        );
                        tokio::time::sleep(self.config.backoff).await;
                        // Re-check the epoch before resuming; the failure
                        // may have been the daemon going down for a
                        // restart.
                        break;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }
}
