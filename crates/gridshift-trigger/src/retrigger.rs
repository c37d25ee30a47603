//! Override retrigger dispatcher.
//!
//! Override set/clear must refresh the affected zone and re-evaluate
//! without blocking the request's response path. A bounded queue
//! drained by a single worker keeps those re-evaluations asynchronous
//! but serialized: a flood of override requests coalesces into dropped
//! enqueues instead of unbounded concurrent selector invocations.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use gridshift_fetch::Fetcher;

use crate::controller::TriggerController;

const QUEUE_DEPTH: usize = 16;

/// Handle for requesting a refresh-and-evaluate of one zone.
#[derive(Clone)]
pub struct Retrigger {
    tx: mpsc::Sender<String>,
}

impl Retrigger {
    /// Spawn the worker task and return the request handle.
    pub fn spawn(
        fetcher: Fetcher,
        trigger: Arc<TriggerController>,
        mut shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<String>(QUEUE_DEPTH);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = rx.recv() => match msg {
                        Some(zone) => {
                            debug!(%zone, "processing retrigger");
                            match fetcher.fetch(&zone).await {
                                Ok(value) => trigger.evaluate(&zone, value).await,
                                Err(e) => {
                                    warn!(%zone, error = %e, "retrigger fetch failed");
                                }
                            }
                        }
                        None => break,
                    },
                    _ = shutdown.changed() => {
                        info!("retrigger worker shutting down");
                        break;
                    }
                }
            }
        });

        (Self { tx }, handle)
    }

    /// Enqueue a zone for refresh-and-evaluate. Never blocks; when the
    /// queue is full the request is dropped (the periodic loop will
    /// catch up on the next pass).
    pub fn request(&self, zone: &str) {
        if self.tx.try_send(zone.to_string()).is_err() {
            warn!(zone, "retrigger queue full; dropping request");
        }
    }
}
