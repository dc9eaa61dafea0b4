//! Per-chat update lanes.
//!
//! Each chat gets a worker that handles its updates strictly in arrival
//! order. Workers for different chats run concurrently. A lane is retired
//! only by the owner, once nothing is queued or in flight on it, so a chat
//! never has two workers at the same time.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

const LANE_IDLE: Duration = Duration::from_secs(60);

/// Handles the items of one lane, one at a time.
#[async_trait]
pub(crate) trait LaneWorker: Send + Sync + 'static {
    type Item: Send + 'static;

    async fn process(&self, key: i64, item: Self::Item);
}

struct Lane<T> {
    tx: mpsc::UnboundedSender<T>,
    /// Items submitted but not yet fully processed.
    pending: Arc<AtomicUsize>,
    last_used: Instant,
}

pub(crate) struct Lanes<W: LaneWorker> {
    worker: Arc<W>,
    cancel: CancellationToken,
    idle: Duration,
    lanes: HashMap<i64, Lane<W::Item>>,
}

impl<W: LaneWorker> Lanes<W> {
    pub(crate) fn new(worker: Arc<W>, cancel: CancellationToken) -> Self {
        Self {
            worker,
            cancel,
            idle: LANE_IDLE,
            lanes: HashMap::new(),
        }
    }

    #[cfg(test)]
    fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    /// Queue `item` on the lane for `key`, starting the lane if needed.
    pub(crate) fn submit(&mut self, key: i64, item: W::Item) {
        let item = match self.lanes.get_mut(&key) {
            Some(lane) => {
                lane.pending.fetch_add(1, Ordering::SeqCst);
                lane.last_used = Instant::now();
                match lane.tx.send(item) {
                    Ok(()) => return,
                    Err(mpsc::error::SendError(item)) => {
                        // Worker stopped on cancellation.
                        self.lanes.remove(&key);
                        item
                    },
                }
            },
            None => item,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(1));
        if tx.send(item).is_err() {
            return;
        }
        tokio::spawn(run_lane(
            key,
            rx,
            Arc::clone(&pending),
            Arc::clone(&self.worker),
            self.cancel.clone(),
        ));
        self.lanes.insert(key, Lane {
            tx,
            pending,
            last_used: Instant::now(),
        });
    }

    /// Retire lanes whose worker stopped, and lanes that have been empty
    /// for the idle period. Dropping the sender lets the worker finish.
    pub(crate) fn prune(&mut self) {
        let idle = self.idle;
        self.lanes.retain(|_, lane| {
            let drained = lane.pending.load(Ordering::SeqCst) == 0;
            !lane.tx.is_closed() && !(drained && lane.last_used.elapsed() >= idle)
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lanes.len()
    }
}

async fn run_lane<W: LaneWorker>(
    key: i64,
    mut rx: mpsc::UnboundedReceiver<W::Item>,
    pending: Arc<AtomicUsize>,
    worker: Arc<W>,
    cancel: CancellationToken,
) {
    debug!(chat_id = key, "lane started");
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => break,
            item = rx.recv() => item,
        };
        let Some(item) = item else {
            break;
        };
        worker.process(key, item).await;
        pending.fetch_sub(1, Ordering::SeqCst);
    }
    debug!(chat_id = key, "lane closed");
}
