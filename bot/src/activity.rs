//! Supervised worker that marks users offline after five minutes of
//! silence. The queue is owned, the task is joined on shutdown, so failures
//! stay observable instead of dying inside a detached task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dialog_flow::ports::UserDirectory;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

const OFFLINE_AFTER: Duration = Duration::from_secs(300);

pub struct ActivityTracker {
    queue: mpsc::UnboundedSender<u64>,
    worker: JoinHandle<()>,
}

impl ActivityTracker {
    pub fn spawn<U: UserDirectory + 'static>(directory: Arc<U>) -> Self {
        let (queue, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(directory, receiver));
        ActivityTracker { queue, worker }
    }

    /// Schedules the offline mark; a newer message for the same user
    /// supersedes the older deadline.
    pub fn touch(&self, user_id: u64) {
        if self.queue.send(user_id).is_err() {
            log::warn!("activity worker is gone, offline mark for {user_id} dropped");
        }
    }

    pub async fn shutdown(self) {
        drop(self.queue);
        if let Err(err) = self.worker.await {
            log::error!("activity worker task failed: {err}");
        }
    }
}

async fn run_worker<U: UserDirectory>(directory: Arc<U>, mut queue: mpsc::UnboundedReceiver<u64>) {
    let mut deadlines: HashMap<u64, Instant> = HashMap::new();

    loop {
        let wake_at = deadlines
            .values()
            .min()
            .copied()
            .unwrap_or_else(|| Instant::now() + OFFLINE_AFTER);
        let has_deadlines = !deadlines.is_empty();

        tokio::select! {
            received = queue.recv() => match received {
                Some(user_id) => {
                    deadlines.insert(user_id, Instant::now() + OFFLINE_AFTER);
                }
                None => break,
            },
            _ = time::sleep_until(wake_at), if has_deadlines => {
                let now = Instant::now();
                let expired: Vec<u64> = deadlines
                    .iter()
                    .filter(|(_, deadline)| **deadline <= now)
                    .map(|(user_id, _)| *user_id)
                    .collect();

                for user_id in expired {
                    deadlines.remove(&user_id);
                    mark_offline(&directory, user_id).await;
                }
            }
        }
    }

    // the queue is closed: nobody is writing anymore, everyone goes offline
    for user_id in deadlines.into_keys() {
        mark_offline(&directory, user_id).await;
    }
}

async fn mark_offline<U: UserDirectory>(directory: &Arc<U>, user_id: u64) {
    log::debug!("marking user {user_id} offline");
    if let Err(err) = directory.update_activity(user_id, false).await {
        log::warn!("offline mark failed for {user_id}: {err:#}");
    }
}
