use blockparty_core::sync::{CandidateDisposition, PeerAction, StateUpdate};
use blockparty_core::{GameState, IceCandidate, PlayerId, PlayerInfo, SignalingMessage};
use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::{ConnectionState, Engine, EngineInner, to_js};
use crate::logger::Logger;

impl Engine {
    pub(super) fn handle_signal(inner: &Rc<RefCell<EngineInner>>, text: String) {
        let message = match SignalingMessage::parse(&text) {
            Ok(m) => m,
            Err(e) => {
                Logger::warn(&format!("Discarding relay frame: {}", e));
                return;
            }
        };

        {
            let inner_ref = inner.borrow();
            let identity = &inner_ref.identity;
            if *message.room_id() != identity.room_id
                || message.recipient().is_some_and(|to| *to != identity.player_id)
            {
                return;
            }
        }

        let inner = inner.clone();
        match message {
            SignalingMessage::PlayerList { data, .. } => {
                Self::handle_player_list(&inner, data.players);
            }

            SignalingMessage::Offer { from, data, .. } => {
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = Self::handle_remote_offer(&inner, &from, data.sdp).await {
                        Logger::error(&format!("Could not answer {}, staying on relay", from), &e);
                        Self::drop_link(&inner, &from);
                    }
                });
            }

            SignalingMessage::Answer { from, data, .. } => {
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = Self::handle_answer(&inner, &from, data.sdp).await {
                        Logger::error(&format!("Could not apply answer from {}", from), &e);
                        Self::drop_link(&inner, &from);
                    }
                });
            }

            SignalingMessage::IceCandidate { from, data, .. } => {
                Self::handle_candidate(&inner, from, data);
            }

            SignalingMessage::GameState { from, data, .. } => {
                Self::apply_state(&inner, &from, &data);
            }

            other => Logger::debug(&format!("Ignoring {} from relay", other.kind())),
        }
    }

    fn handle_player_list(inner: &Rc<RefCell<EngineInner>>, players: Vec<PlayerInfo>) {
        let (actions, diff, joined) = {
            let mut inner_mut = inner.borrow_mut();
            let listed_self = players
                .iter()
                .any(|p| p.player_id == inner_mut.identity.player_id);

            let joined = if listed_self {
                inner_mut.pending_connect.take()
            } else {
                None
            };
            if joined.is_some() {
                inner_mut.state = ConnectionState::Joined;
            }

            let actions = inner_mut.peers.on_roster(&players);
            let diff = inner_mut.roster.apply_player_list(&players);
            (actions, diff, joined)
        };

        if let Some((resolve, _)) = joined {
            Logger::info("Joined room");
            let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
        }

        for action in actions {
            match action {
                PeerAction::Initiate(peer) => {
                    let inner = inner.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        if let Err(e) = Self::init_connection(&inner, &peer).await {
                            Logger::error(&format!("Could not offer to {}, staying on relay", peer), &e);
                            Self::drop_link(&inner, &peer);
                        }
                    });
                }
                PeerAction::Teardown(peer) => {
                    Logger::info(&format!("{} left the room", peer));
                    Self::close_link(inner, &peer);
                }
            }
        }

        let callback = inner.borrow().on_roster.clone();
        if let (Some(diff), Some(players)) = (to_js(&diff), to_js(&players)) {
            Self::notify(callback, &[diff, players]);
        }
    }

    fn handle_candidate(inner: &Rc<RefCell<EngineInner>>, from: PlayerId, candidate: IceCandidate) {
        let disposition = {
            let mut inner_mut = inner.borrow_mut();
            let Some(negotiation) = inner_mut.peers.get_mut(&from) else {
                return;
            };
            negotiation.remote_candidate(candidate)
        };

        let CandidateDisposition::Apply(candidate) = disposition else {
            return;
        };
        let Some(pc) = inner.borrow().links.get(&from).map(|link| link.pc.clone()) else {
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = Self::add_candidate(&pc, &candidate).await {
                Logger::warn(&format!("Error adding ICE from {}: {:?}", from, e));
            }
        });
    }

    pub(crate) fn apply_state(inner: &Rc<RefCell<EngineInner>>, from: &PlayerId, state: &GameState) {
        let view = {
            let mut inner_mut = inner.borrow_mut();
            match inner_mut.roster.apply_game_state(from, state) {
                StateUpdate::Applied { .. } => inner_mut.roster.peer(from).cloned(),
                StateUpdate::Stale | StateUpdate::Ignored => None,
            }
        };

        let Some(view) = view else { return };
        let callback = inner.borrow().on_peer_state.clone();
        if let Some(value) = to_js(&view) {
            Self::notify(callback, &[value]);
        }
    }
}
