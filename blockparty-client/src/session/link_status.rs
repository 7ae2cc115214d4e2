use blockparty_core::PlayerId;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Which delivery paths a session still has. Written by the session loop,
/// read through the [`Session`](crate::Session) handle.
pub(crate) struct LinkStatus {
    relay_connected: AtomicBool,
    direct: Mutex<BTreeSet<PlayerId>>,
}

impl LinkStatus {
    pub(crate) fn new() -> Self {
        Self {
            relay_connected: AtomicBool::new(true),
            direct: Mutex::new(BTreeSet::new()),
        }
    }

    pub(crate) fn relay_connected(&self) -> bool {
        self.relay_connected.load(Ordering::Acquire)
    }

    pub(crate) fn relay_lost(&self) {
        self.relay_connected.store(false, Ordering::Release);
    }

    pub(crate) fn channel_opened(&self, peer: &PlayerId) {
        self.direct().insert(peer.clone());
    }

    pub(crate) fn channel_closed(&self, peer: &PlayerId) {
        self.direct().remove(peer);
    }

    pub(crate) fn clear(&self) {
        self.direct().clear();
    }

    pub(crate) fn direct_peers(&self) -> Vec<PlayerId> {
        self.direct().iter().cloned().collect()
    }

    fn direct(&self) -> std::sync::MutexGuard<'_, BTreeSet<PlayerId>> {
        self.direct.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
