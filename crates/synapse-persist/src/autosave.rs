use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use synapse_core::DiagramState;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::slot::{self, StateSlot};

/// Background task that writes the document to a slot once it has been
/// quiet for `delay`.
///
/// Each change restarts the countdown. Writes run inline in the task, so at
/// most one is in flight; changes that land during a write start a new
/// countdown afterwards. Stopping (or dropping the store's sender) flushes
/// any change still waiting for its countdown.
#[derive(Debug)]
pub struct Autosave {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Autosave {
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        changes: watch::Receiver<DiagramState>,
        slot: Arc<dyn StateSlot>,
        delay: Duration,
    ) -> Self {
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(run(changes, slot, delay, stopped));
        debug!("autosave: spawned with {}ms delay", delay.as_millis());
        Self {
            stop: Some(stop),
            task,
        }
    }

    /// Flush a pending write and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = self.task.await {
            warn!("autosave: task ended abnormally: {e}");
        }
    }
}

async fn run(
    mut changes: watch::Receiver<DiagramState>,
    slot: Arc<dyn StateSlot>,
    delay: Duration,
    mut stopped: oneshot::Receiver<()>,
) {
    let mut pending = false;
    loop {
        if pending {
            tokio::select! {
                biased;
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(delay) => {
                    write(slot.as_ref(), &mut changes).await;
                    pending = false;
                }
                _ = &mut stopped => break,
            }
        } else {
            tokio::select! {
                biased;
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    pending = true;
                }
                _ = &mut stopped => break,
            }
        }
    }
    if pending || changes.borrow().has_changed() {
        write(slot.as_ref(), &mut changes).await;
    }
    debug!("autosave: stopped");
}

/// Storage failures are logged and dropped; the next change schedules
/// another attempt.
async fn write(slot: &dyn StateSlot, changes: &mut watch::Receiver<DiagramState>) {
    let state = changes.borrow_and_update().clone();
    let nodes = state.nodes.len();
    match slot::save(slot, state).await {
        Ok(()) => debug!("autosave: wrote {nodes} nodes"),
        Err(e) => warn!("autosave: write failed: {e}"),
    }
}
