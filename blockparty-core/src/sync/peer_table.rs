use crate::model::{PlayerId, PlayerInfo};
use crate::sync::negotiation::{Negotiation, NegotiationError, NegotiationState, Role};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAction {
    /// Open a connection and send an offer to this peer.
    Initiate(PlayerId),
    /// Close whatever connection exists with this peer.
    Teardown(PlayerId),
}

/// One negotiation per remote player.
///
/// Only one side of a pair offers: the player that joins later offers to every
/// member listed in the first roster it receives, and members already in the
/// room wait for the newcomer's offer. Two clients that both offered at once
/// would otherwise each discard the other's connection.
#[derive(Debug)]
pub struct PeerTable {
    local: PlayerId,
    peers: HashMap<PlayerId, Negotiation>,
    seen_first_roster: bool,
}

impl PeerTable {
    pub fn new(local: PlayerId) -> Self {
        Self {
            local,
            peers: HashMap::new(),
            seen_first_roster: false,
        }
    }

    pub fn local(&self) -> &PlayerId {
        &self.local
    }

    pub fn on_roster(&mut self, players: &[PlayerInfo]) -> Vec<PeerAction> {
        let listed: BTreeSet<&PlayerId> = players
            .iter()
            .map(|p| &p.player_id)
            .filter(|id| **id != self.local)
            .collect();

        let mut gone: Vec<PlayerId> = self
            .peers
            .keys()
            .filter(|id| !listed.contains(id))
            .cloned()
            .collect();
        gone.sort();

        let mut actions = Vec::new();
        for id in gone {
            if let Some(mut negotiation) = self.peers.remove(&id) {
                negotiation.close();
            }
            actions.push(PeerAction::Teardown(id));
        }

        if !self.seen_first_roster {
            self.seen_first_roster = true;
            for id in listed {
                if self.peers.contains_key(id) {
                    continue;
                }
                self.peers
                    .insert(id.clone(), Negotiation::initiator(id.clone()));
                actions.push(PeerAction::Initiate(id.clone()));
            }
        }

        actions
    }

    /// Starts a responder negotiation for an inbound offer.
    ///
    /// Returns `true` when an earlier negotiation with the same peer was
    /// replaced and its connection has to be closed first.
    pub fn accept_offer(&mut self, from: &PlayerId) -> Result<bool, NegotiationError> {
        let replaced = match self.peers.get(from) {
            Some(existing) => {
                existing.role() == Role::Initiator || existing.state() != NegotiationState::Idle
            }
            None => false,
        };
        let mut negotiation = Negotiation::responder(from.clone());
        negotiation.receive_offer()?;
        if let Some(mut old) = self.peers.insert(from.clone(), negotiation) {
            old.close();
        }
        Ok(replaced)
    }

    pub fn get(&self, peer_id: &PlayerId) -> Option<&Negotiation> {
        self.peers.get(peer_id)
    }

    pub fn get_mut(&mut self, peer_id: &PlayerId) -> Option<&mut Negotiation> {
        self.peers.get_mut(peer_id)
    }

    pub fn remove(&mut self, peer_id: &PlayerId) -> Option<Negotiation> {
        let mut negotiation = self.peers.remove(peer_id)?;
        negotiation.close();
        Some(negotiation)
    }

    pub fn close_all(&mut self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.peers.drain().map(|(id, _)| id).collect();
        ids.sort();
        ids
    }

    pub fn connected_peers(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .peers
            .values()
            .filter(|n| n.is_connected())
            .map(|n| n.peer_id().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
