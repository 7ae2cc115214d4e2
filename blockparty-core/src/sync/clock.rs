use crate::model::GameState;

/// Stamps outgoing snapshots so their timestamps never go backwards, even if
/// the wall clock does.
#[derive(Debug, Default)]
pub struct StateClock {
    last: u64,
}

impl StateClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self, state: &mut GameState, now_ms: u64) {
        self.last = self.last.max(now_ms);
        state.timestamp = self.last;
    }

    pub fn last(&self) -> u64 {
        self.last
    }
}
