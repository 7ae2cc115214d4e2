use crate::model::{IceCandidate, PlayerId};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sends the offer. Always the player that joined the room later.
    Initiator,
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Offering,
    AwaitingAnswer,
    ReceivingOffer,
    Answering,
    Connected,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("cannot {action} as {role:?} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        role: Role,
        state: NegotiationState,
    },
}

/// What the caller should do with a candidate that just arrived from the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateDisposition {
    Apply(IceCandidate),
    /// Held until the remote description is applied.
    Buffered,
    Discarded,
}

/// Negotiation progress with a single remote player.
#[derive(Debug)]
pub struct Negotiation {
    peer_id: PlayerId,
    role: Role,
    state: NegotiationState,
    remote_description_set: bool,
    pending_candidates: Vec<IceCandidate>,
}

impl Negotiation {
    pub fn initiator(peer_id: PlayerId) -> Self {
        Self::new(peer_id, Role::Initiator)
    }

    pub fn responder(peer_id: PlayerId) -> Self {
        Self::new(peer_id, Role::Responder)
    }

    fn new(peer_id: PlayerId, role: Role) -> Self {
        Self {
            peer_id,
            role,
            state: NegotiationState::Idle,
            remote_description_set: false,
            pending_candidates: Vec::new(),
        }
    }

    pub fn peer_id(&self) -> &PlayerId {
        &self.peer_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == NegotiationState::Connected
    }

    pub fn is_closed(&self) -> bool {
        self.state == NegotiationState::Closed
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    fn transition(
        &mut self,
        action: &'static str,
        role: Role,
        from: &[NegotiationState],
        to: NegotiationState,
    ) -> Result<(), NegotiationError> {
        if self.role != role || !from.contains(&self.state) {
            return Err(NegotiationError::InvalidTransition {
                action,
                role: self.role,
                state: self.state,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn begin_offer(&mut self) -> Result<(), NegotiationError> {
        self.transition(
            "create offer",
            Role::Initiator,
            &[NegotiationState::Idle],
            NegotiationState::Offering,
        )
    }

    pub fn offer_sent(&mut self) -> Result<(), NegotiationError> {
        self.transition(
            "send offer",
            Role::Initiator,
            &[NegotiationState::Offering],
            NegotiationState::AwaitingAnswer,
        )
    }

    /// Marks the answer as applied and hands back candidates that arrived early.
    pub fn answer_applied(&mut self) -> Result<Vec<IceCandidate>, NegotiationError> {
        self.transition(
            "apply answer",
            Role::Initiator,
            &[NegotiationState::AwaitingAnswer],
            NegotiationState::AwaitingAnswer,
        )?;
        Ok(self.flush())
    }

    pub fn receive_offer(&mut self) -> Result<(), NegotiationError> {
        self.transition(
            "receive offer",
            Role::Responder,
            &[NegotiationState::Idle],
            NegotiationState::ReceivingOffer,
        )
    }

    /// Marks the offer as applied and hands back candidates that arrived early.
    pub fn offer_applied(&mut self) -> Result<Vec<IceCandidate>, NegotiationError> {
        self.transition(
            "apply offer",
            Role::Responder,
            &[NegotiationState::ReceivingOffer],
            NegotiationState::Answering,
        )?;
        Ok(self.flush())
    }

    pub fn remote_candidate(&mut self, candidate: IceCandidate) -> CandidateDisposition {
        if self.is_closed() {
            return CandidateDisposition::Discarded;
        }
        if self.remote_description_set {
            return CandidateDisposition::Apply(candidate);
        }
        self.pending_candidates.push(candidate);
        CandidateDisposition::Buffered
    }

    pub fn channel_open(&mut self) -> Result<(), NegotiationError> {
        let waiting = match self.role {
            Role::Initiator => NegotiationState::AwaitingAnswer,
            Role::Responder => NegotiationState::Answering,
        };
        if !self.remote_description_set {
            return Err(NegotiationError::InvalidTransition {
                action: "open channel",
                role: self.role,
                state: self.state,
            });
        }
        self.transition(
            "open channel",
            self.role,
            &[waiting, NegotiationState::Connected],
            NegotiationState::Connected,
        )
    }

    /// Returns `false` when the negotiation was already closed.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.state = NegotiationState::Closed;
        self.pending_candidates.clear();
        true
    }

    fn flush(&mut self) -> Vec<IceCandidate> {
        self.remote_description_set = true;
        std::mem::take(&mut self.pending_candidates)
    }
}
