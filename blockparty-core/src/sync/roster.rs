use crate::model::{Board, GameState, PieceSnapshot, PlayerId, PlayerInfo, empty_board};
use crate::utils::GAME_START_GRACE_MS;
use serde::Serialize;
use std::collections::BTreeMap;

/// Local mirror of one remote player's game.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerView {
    pub player_id: PlayerId,
    pub player_name: String,
    pub board: Board,
    pub current: Option<PieceSnapshot>,
    pub next: Option<PieceSnapshot>,
    pub score: u64,
    pub game_over: bool,
    pub game_start_time: Option<u64>,
    pub last_timestamp: Option<u64>,
}

impl PeerView {
    fn new(player_id: PlayerId, player_name: String) -> Self {
        Self {
            player_id,
            player_name,
            board: empty_board(),
            current: None,
            next: None,
            score: 0,
            game_over: false,
            game_start_time: None,
            last_timestamp: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some() && !self.game_over
    }

    fn apply(&mut self, state: &GameState) {
        self.last_timestamp = Some(state.timestamp);
        if !state.player_name.is_empty() {
            self.player_name.clone_from(&state.player_name);
        }

        if state.game_over {
            self.board = empty_board();
            self.current = None;
            self.score = state.score;
            self.game_over = true;
            self.game_start_time = None;
            return;
        }

        self.board.clone_from(&state.board);
        self.current.clone_from(&state.current);
        self.next.clone_from(&state.next);
        self.score = state.score;
        self.game_over = false;
        if state.game_start_time.is_some() {
            self.game_start_time = state.game_start_time;
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RosterDiff {
    pub joined: Vec<PlayerInfo>,
    pub left: Vec<PlayerId>,
}

impl RosterDiff {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateUpdate {
    Applied { created: bool },
    /// Older than a state already applied for that peer.
    Stale,
    /// The update described the local player.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartEligibility {
    Allowed,
    /// Another player has been playing for longer than the grace window.
    Blocked { by: PlayerId },
}

/// Perceived membership of the room, excluding the local player.
#[derive(Debug)]
pub struct Roster {
    local: PlayerId,
    peers: BTreeMap<PlayerId, PeerView>,
}

impl Roster {
    pub fn new(local: PlayerId) -> Self {
        Self {
            local,
            peers: BTreeMap::new(),
        }
    }

    pub fn local(&self) -> &PlayerId {
        &self.local
    }

    pub fn apply_player_list(&mut self, players: &[PlayerInfo]) -> RosterDiff {
        let listed: BTreeMap<&PlayerId, &PlayerInfo> = players
            .iter()
            .filter(|p| p.player_id != self.local)
            .map(|p| (&p.player_id, p))
            .collect();

        let mut diff = RosterDiff::default();

        let departed: Vec<PlayerId> = self
            .peers
            .keys()
            .filter(|id| !listed.contains_key(id))
            .cloned()
            .collect();
        for id in departed {
            self.peers.remove(&id);
            diff.left.push(id);
        }

        for (id, info) in listed {
            match self.peers.get_mut(id) {
                Some(view) => view.player_name.clone_from(&info.player_name),
                None => {
                    self.peers.insert(
                        id.clone(),
                        PeerView::new(id.clone(), info.player_name.clone()),
                    );
                    diff.joined.push(info.clone());
                }
            }
        }

        diff
    }

    /// Applies a full snapshot from `from`, creating the entry if the roster
    /// has not named that player yet.
    pub fn apply_game_state(&mut self, from: &PlayerId, state: &GameState) -> StateUpdate {
        if *from == self.local {
            return StateUpdate::Ignored;
        }

        let created = !self.peers.contains_key(from);
        let view = self
            .peers
            .entry(from.clone())
            .or_insert_with(|| PeerView::new(from.clone(), state.player_name.clone()));

        if matches!(view.last_timestamp, Some(last) if state.timestamp < last) {
            return StateUpdate::Stale;
        }

        view.apply(state);
        StateUpdate::Applied { created }
    }

    pub fn peer(&self, id: &PlayerId) -> Option<&PeerView> {
        self.peers.get(id)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerView> {
        self.peers.values()
    }

    pub fn peer_ids(&self) -> Vec<PlayerId> {
        self.peers.keys().cloned().collect()
    }

    pub fn remove(&mut self, id: &PlayerId) -> Option<PeerView> {
        self.peers.remove(id)
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Whether the local player may press start at `now_ms`.
    ///
    /// Joining a running game is allowed during the first
    /// [`GAME_START_GRACE_MS`] of any other player's game. This only gates the
    /// local start action; two players starting inside the window both play.
    pub fn can_start(&self, now_ms: u64) -> StartEligibility {
        self.peers
            .values()
            .filter(|view| view.is_playing())
            .find(|view| {
                view.game_start_time
                    .is_some_and(|start| now_ms.saturating_sub(start) > GAME_START_GRACE_MS)
            })
            .map_or(StartEligibility::Allowed, |view| StartEligibility::Blocked {
                by: view.player_id.clone(),
            })
    }
}
