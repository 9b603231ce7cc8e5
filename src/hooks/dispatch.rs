//! Webhook deliveries are answered right away and announced later, by a small fixed pool of
//! workers pulling from a bounded queue.
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use std::sync::Arc;

use super::event::HookEvent;
use super::messages::render;
use crate::faces::Face;
use crate::store::Subscription;

/// One delivery, already matched to the channels that want it.
#[derive(Debug)]
pub struct HookJob {
    pub event: String,
    pub payload: Value,
    pub subscriptions: Vec<Subscription>,
}

#[derive(Clone)]
pub struct HookQueue {
    tx: mpsc::Sender<HookJob>,
}

impl HookQueue {
    /// Spawn `workers` tasks sharing a queue `depth` jobs deep. Workers stop once every
    /// `HookQueue` handle has been dropped and the queue drains.
    pub fn start(face: Arc<dyn Face>, workers: usize, depth: usize) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let handles = (0..workers.max(1))
            .map(|id| {
                let rx = Arc::clone(&rx);
                let face = Arc::clone(&face);
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(job) = next else { break };
                        deliver(face.as_ref(), job).await;
                    }
                    log::debug!("hook worker {id} stopping");
                })
            })
            .collect();
        (HookQueue { tx }, handles)
    }

    /// Queue a job without waiting. Returns false if it had to be dropped.
    pub fn submit(&self, job: HookJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                log::warn!(
                    "hook queue is full; dropping {} delivery for {} channel(s)",
                    job.event,
                    job.subscriptions.len()
                );
                false
            }
            Err(TrySendError::Closed(job)) => {
                log::error!("hook workers are gone; dropping {} delivery", job.event);
                false
            }
        }
    }
}

/// Announce one delivery in every subscribed channel. Problems are logged, never raised.
pub async fn deliver(face: &dyn Face, job: HookJob) {
    let event = match HookEvent::parse(&job.event, job.payload) {
        Ok(HookEvent::Unhandled { event, action }) => {
            log::debug!("not announcing {event}/{}", action.unwrap_or_default());
            return;
        }
        Ok(event) => event,
        Err(e) => {
            log::info!("suppressing webhook delivery: {e}");
            return;
        }
    };

    for sub in &job.subscriptions {
        for line in render(&event, &sub.colors) {
            if let Err(e) = face.say(&sub.channel, &line).await {
                log::warn!(
                    "failed to announce {} event for {} in {}: {e:#}",
                    job.event,
                    sub.repo,
                    sub.channel
                );
            }
        }
    }
}
