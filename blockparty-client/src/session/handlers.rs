use blockparty_core::PlayerInfo;
use blockparty_core::sync::{PeerView, RosterDiff};

/// Called with the peer's cached view after every applied state update.
pub type PeerStateHandler = Box<dyn Fn(&PeerView) + Send + Sync>;

/// Called for every roster the relay sends, with what changed and the full list.
pub type RosterHandler = Box<dyn Fn(&RosterDiff, &[PlayerInfo]) + Send + Sync>;

/// Callbacks into the embedding UI. They run on the session task, so they
/// should hand work off rather than block.
#[derive(Default)]
pub struct SessionHandlers {
    pub on_peer_state: Option<PeerStateHandler>,
    pub on_roster: Option<RosterHandler>,
}

impl SessionHandlers {
    pub fn on_peer_state(mut self, handler: impl Fn(&PeerView) + Send + Sync + 'static) -> Self {
        self.on_peer_state = Some(Box::new(handler));
        self
    }

    pub fn on_roster(
        mut self,
        handler: impl Fn(&RosterDiff, &[PlayerInfo]) + Send + Sync + 'static,
    ) -> Self {
        self.on_roster = Some(Box::new(handler));
        self
    }
}
