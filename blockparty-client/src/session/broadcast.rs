use crate::session::session::Outbox;
use blockparty_core::GameState;
use blockparty_core::utils::BROADCAST_INTERVAL_MS;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Keeps the periodic state broadcast alive. Dropping it stops the timer.
#[must_use = "the broadcast stops as soon as the guard is dropped"]
pub struct BroadcastGuard {
    task: Option<JoinHandle<()>>,
}

impl BroadcastGuard {
    pub(crate) fn spawn(outbox: Arc<Outbox>, source: watch::Receiver<GameState>) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(BROADCAST_INTERVAL_MS));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let state = source.borrow().clone();
                if outbox.send_state(state).is_err() {
                    debug!("Session closed, broadcast stops");
                    break;
                }
            }
        });

        Self { task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn stop(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for BroadcastGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}
