//! Leader/follower consensus on a ledger channel's outcome.
//!
//! The leader proposes updates, the follower countersigns them strictly in
//! order. Proposals are queued on both sides until they are countersigned,
//! so the leader can keep proposing without waiting for the follower. The
//! consensus state (`current`) always carries both signatures.
//!
//! ```text
//!   leader                                    follower
//!   propose(add)     ── SignedProposal ──▶    receive
//!                                             sign_next_proposal
//!   update_consensus ◀── SignedProposal ──
//! ```
//!
//! Every operation works on a copy and only writes it back once all checks
//! passed, so a failed call never changes the channel.

use super::{
    outcome::{Guarantee, LedgerOutcome},
    proposal::{Proposal, SignedProposal},
    signed::SignedVars,
    state::{FixedPart, StateError},
    vars::{Add, InvalidAdd, Vars},
    ChannelId, Role,
};
use crate::{
    abiencode::{
        self,
        types::{Address, Signature},
    },
    sig::Signer,
};
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("only the leader may do this")]
    NotLeader,
    #[error("only the follower may do this")]
    NotFollower,
    #[error("proposal is for channel {got:?}, expected {expected:?}")]
    IncorrectChannelId { expected: ChannelId, got: ChannelId },
    #[error("proposal has turn number {got}, expected {expected}")]
    InvalidTurnNum { expected: u64, got: u64 },
    #[error("turn number {0} has no successor")]
    TurnNumOverflow(u64),
    #[error("no proposals in the queue")]
    NoProposals,
    #[error("proposal does not match the first queued proposal")]
    NonMatchingProposals,
    #[error("no queued proposal reaches turn number {0}")]
    ProposalQueueExhausted(u64),
    #[error("proposal is not signed by the leader")]
    InvalidProposalSignature,
    /// `actual` is `None` if no signer can be recovered from the signature.
    #[error("signed by {actual:?}, expected {expected:?}")]
    WrongSigner {
        expected: Address,
        actual: Option<Address>,
    },
    #[error("the {role:?} did not sign the consensus state (signed by {signer:?})")]
    ConsensusNotSigned { role: Role, signer: Address },
    #[error("invalid proposal: {0}")]
    InvalidAdd(#[from] InvalidAdd),
    #[error("queued proposal for turn {turn_num} no longer applies: {source}")]
    CorruptProposalQueue { turn_num: u64, source: InvalidAdd },
    #[error(transparent)]
    State(#[from] StateError),
}

impl From<abiencode::Error> for ConsensusError {
    fn from(e: abiencode::Error) -> Self {
        Self::State(e.into())
    }
}

/// Where the channel is in the propose/countersign cycle, see
/// [ConsensusChannel::phase].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase<'a> {
    /// Nothing is waiting to be countersigned.
    Settled { current: &'a SignedVars },
    /// Proposals are queued on top of the consensus state.
    Pipelined {
        current: &'a SignedVars,
        queue: &'a [SignedProposal],
    },
}

/// One participant's view of a two-party ledger channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusChannel {
    id: ChannelId,
    fp: FixedPart,
    my_index: Role,
    current: SignedVars,
    proposal_queue: Vec<SignedProposal>,
}

impl ConsensusChannel {
    /// Build the leader's view of a channel from a doubly-signed state.
    pub fn new_leader_channel(
        fp: FixedPart,
        turn_num: u64,
        outcome: LedgerOutcome,
        signatures: [Signature; 2],
    ) -> Result<Self, ConsensusError> {
        Self::new(fp, Role::Leader, turn_num, outcome, signatures)
    }

    /// Build the follower's view of a channel from a doubly-signed state.
    pub fn new_follower_channel(
        fp: FixedPart,
        turn_num: u64,
        outcome: LedgerOutcome,
        signatures: [Signature; 2],
    ) -> Result<Self, ConsensusError> {
        Self::new(fp, Role::Follower, turn_num, outcome, signatures)
    }

    fn new(
        fp: FixedPart,
        my_index: Role,
        turn_num: u64,
        outcome: LedgerOutcome,
        signatures: [Signature; 2],
    ) -> Result<Self, ConsensusError> {
        let current = SignedVars {
            vars: Vars { turn_num, outcome },
            signatures,
        };
        let channel = Self {
            id: fp.channel_id()?,
            fp,
            my_index,
            current,
            proposal_queue: Vec::new(),
        };
        channel.verify_consensus()?;
        Ok(channel)
    }

    /// Rebuild a channel from persisted parts, checking the consensus
    /// signatures and that every queued proposal is signed by the leader and
    /// applies on top of the previous one.
    pub fn restore(
        fp: FixedPart,
        my_index: Role,
        current: SignedVars,
        proposal_queue: Vec<SignedProposal>,
    ) -> Result<Self, ConsensusError> {
        let mut channel = Self::new(
            fp,
            my_index,
            current.vars.turn_num,
            current.vars.outcome,
            current.signatures,
        )?;

        let mut latest = channel.current.vars.clone();
        for p in &proposal_queue {
            channel.validate_proposal_id(&p.proposal)?;
            channel.check_next_proposal(&mut latest, p)?;
        }
        channel.proposal_queue = proposal_queue;
        Ok(channel)
    }

    fn verify_consensus(&self) -> Result<(), ConsensusError> {
        let state = self.current.vars.as_state(&self.fp);
        for role in [Role::Leader, Role::Follower] {
            let signer = state.recover_signer(self.current.signature(role))?;
            if signer != self.fp.participant(role) {
                return Err(ConsensusError::ConsensusNotSigned { role, signer });
            }
        }
        Ok(())
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn fixed_part(&self) -> &FixedPart {
        &self.fp
    }

    pub fn my_index(&self) -> Role {
        self.my_index
    }

    pub fn is_leader(&self) -> bool {
        self.my_index == Role::Leader
    }

    pub fn is_follower(&self) -> bool {
        self.my_index == Role::Follower
    }

    pub fn leader(&self) -> Address {
        self.fp.participant(Role::Leader)
    }

    pub fn follower(&self) -> Address {
        self.fp.participant(Role::Follower)
    }

    pub fn participants(&self) -> [Address; 2] {
        self.fp.participants
    }

    pub fn consensus_turn_num(&self) -> u64 {
        self.current.vars.turn_num
    }

    pub fn consensus_vars(&self) -> &Vars {
        &self.current.vars
    }

    pub fn current(&self) -> &SignedVars {
        &self.current
    }

    /// Signatures on the consensus state, indexed by [Role].
    pub fn signatures(&self) -> [Signature; 2] {
        self.current.signatures
    }

    pub fn proposal_queue(&self) -> &[SignedProposal] {
        &self.proposal_queue
    }

    pub fn phase(&self) -> Phase<'_> {
        if self.proposal_queue.is_empty() {
            Phase::Settled {
                current: &self.current,
            }
        } else {
            Phase::Pipelined {
                current: &self.current,
                queue: &self.proposal_queue,
            }
        }
    }

    /// Whether the consensus outcome contains exactly `g`.
    pub fn includes(&self, g: &Guarantee) -> bool {
        self.current.vars.outcome.includes(g)
    }

    /// Whether the consensus outcome funds `target`.
    pub fn includes_target(&self, target: &ChannelId) -> bool {
        self.current.vars.outcome.includes_target(target)
    }

    /// The consensus vars with every queued proposal applied.
    pub fn latest_proposed_vars(&self) -> Result<Vars, ConsensusError> {
        let mut vars = self.current.vars.clone();
        for p in &self.proposal_queue {
            apply_queued(&mut vars, p)?;
        }
        Ok(vars)
    }

    /// Whether `g` is in the latest proposed outcome but not (yet) in the
    /// consensus outcome. Leader only.
    pub fn is_proposed(&self, g: &Guarantee) -> Result<bool, ConsensusError> {
        self.require_leader()?;
        let latest = self.latest_proposed_vars()?;
        Ok(latest.outcome.includes(g) && !self.includes(g))
    }

    pub fn validate_proposal_id(&self, p: &Proposal) -> Result<(), ConsensusError> {
        if p.channel_id != self.id {
            return Err(ConsensusError::IncorrectChannelId {
                expected: self.id,
                got: p.channel_id,
            });
        }
        Ok(())
    }

    /// Queue a new proposal on top of the latest proposed state and sign the
    /// result. The turn number of `add` is overwritten with the next one.
    /// Leader only.
    ///
    /// The returned proposal has to be sent to the follower.
    pub fn propose(
        &mut self,
        mut add: Add,
        signer: &Signer,
    ) -> Result<SignedProposal, ConsensusError> {
        self.require_leader()?;

        let mut vars = self.latest_proposed_vars()?;
        add.set_turn_num(next_turn_num(vars.turn_num)?);
        vars.add(&add)?;

        let signature = self.sign(&vars, signer)?;
        let signed = SignedProposal {
            proposal: Proposal::add(self.id, add),
            signature,
        };
        self.proposal_queue.push(signed);

        debug!(
            channel = ?self.id,
            turn_num = add.turn_num(),
            target = ?add.target(),
            queued = self.proposal_queue.len(),
            "proposed guarantee"
        );
        Ok(signed)
    }

    /// Queue a proposal received from the leader after checking that it is
    /// the next in line and signed by the leader. Follower only.
    pub fn receive(&mut self, p: SignedProposal) -> Result<(), ConsensusError> {
        self.require_follower()?;
        self.validate_proposal_id(&p.proposal)?;

        let mut latest = self.latest_proposed_vars()?;
        if let Err(e) = self.check_next_proposal(&mut latest, &p) {
            warn!(channel = ?self.id, turn_num = p.turn_num(), "rejected proposal: {}", e);
            return Err(e);
        }
        self.proposal_queue.push(p);

        debug!(
            channel = ?self.id,
            turn_num = p.turn_num(),
            queued = self.proposal_queue.len(),
            "received proposal"
        );
        Ok(())
    }

    /// Apply `p` to `latest`, which must be the latest proposed vars, and
    /// check the leader's signature on the result.
    fn check_next_proposal(
        &self,
        latest: &mut Vars,
        p: &SignedProposal,
    ) -> Result<(), ConsensusError> {
        let expected = next_turn_num(latest.turn_num)?;
        if p.turn_num() != expected {
            return Err(ConsensusError::InvalidTurnNum {
                expected,
                got: p.turn_num(),
            });
        }
        latest.apply(&p.proposal.kind)?;

        match latest.as_state(&self.fp).recover_signer(p.signature) {
            Ok(signer) if signer == self.leader() => Ok(()),
            _ => Err(ConsensusError::InvalidProposalSignature),
        }
    }

    /// Countersign the first queued proposal, which must equal `expected`,
    /// and make it the new consensus state. Follower only.
    ///
    /// The returned proposal carries the follower's signature and has to be
    /// sent back to the leader.
    pub fn sign_next_proposal(
        &mut self,
        expected: &Proposal,
        signer: &Signer,
    ) -> Result<SignedProposal, ConsensusError> {
        self.require_follower()?;
        self.validate_proposal_id(expected)?;

        let head = *self
            .proposal_queue
            .first()
            .ok_or(ConsensusError::NoProposals)?;
        if head.proposal != *expected {
            return Err(ConsensusError::NonMatchingProposals);
        }

        let mut vars = self.current.vars.clone();
        apply_queued(&mut vars, &head)?;
        let signature = self.sign(&vars, signer)?;

        self.current = SignedVars {
            vars,
            signatures: [head.signature, signature],
        };
        self.proposal_queue.remove(0);

        debug!(
            channel = ?self.id,
            turn_num = self.current.vars.turn_num,
            queued = self.proposal_queue.len(),
            "countersigned proposal"
        );
        Ok(SignedProposal {
            proposal: head.proposal,
            signature,
        })
    }

    /// Advance the consensus state to the queued proposal the follower
    /// countersigned, dropping it and everything before it from the queue.
    /// Leader only.
    ///
    /// Countersignatures for turns at or below the consensus turn number are
    /// ignored, so replaying one is harmless.
    pub fn update_consensus(
        &mut self,
        countersigned: &SignedProposal,
    ) -> Result<(), ConsensusError> {
        self.require_leader()?;
        self.validate_proposal_id(&countersigned.proposal)?;

        let turn_num = countersigned.turn_num();
        if turn_num <= self.current.vars.turn_num {
            trace!(
                channel = ?self.id,
                turn_num,
                consensus_turn_num = self.current.vars.turn_num,
                "ignoring stale countersignature"
            );
            return Ok(());
        }

        let mut candidate = self.current.vars.clone();
        let mut matched = None;
        for (i, ours) in self.proposal_queue.iter().enumerate() {
            apply_queued(&mut candidate, ours)?;
            if candidate.turn_num == turn_num {
                matched = Some((i, ours.signature));
                break;
            }
        }
        let (i, leader_signature) =
            matched.ok_or(ConsensusError::ProposalQueueExhausted(turn_num))?;

        let signer = candidate
            .as_state(&self.fp)
            .recover_signer(countersigned.signature)
            .ok();
        if signer != Some(self.follower()) {
            warn!(channel = ?self.id, turn_num, ?signer, "countersignature from wrong signer");
            return Err(ConsensusError::WrongSigner {
                expected: self.follower(),
                actual: signer,
            });
        }

        self.current = SignedVars {
            vars: candidate,
            signatures: [leader_signature, countersigned.signature],
        };
        self.proposal_queue = self.proposal_queue.split_off(i + 1);

        debug!(
            channel = ?self.id,
            turn_num,
            queued = self.proposal_queue.len(),
            "consensus advanced"
        );
        Ok(())
    }

    fn sign(&self, vars: &Vars, signer: &Signer) -> Result<Signature, ConsensusError> {
        let me = self.fp.participant(self.my_index);
        if signer.address() != me {
            return Err(ConsensusError::WrongSigner {
                expected: me,
                actual: Some(signer.address()),
            });
        }
        Ok(vars.as_state(&self.fp).sign(signer)?)
    }

    fn require_leader(&self) -> Result<(), ConsensusError> {
        match self.my_index {
            Role::Leader => Ok(()),
            Role::Follower => Err(ConsensusError::NotLeader),
        }
    }

    fn require_follower(&self) -> Result<(), ConsensusError> {
        match self.my_index {
            Role::Follower => Ok(()),
            Role::Leader => Err(ConsensusError::NotFollower),
        }
    }
}

fn next_turn_num(turn_num: u64) -> Result<u64, ConsensusError> {
    turn_num
        .checked_add(1)
        .ok_or(ConsensusError::TurnNumOverflow(turn_num))
}

fn apply_queued(vars: &mut Vars, p: &SignedProposal) -> Result<(), ConsensusError> {
    vars.apply(&p.proposal.kind)
        .map_err(|source| ConsensusError::CorruptProposalQueue {
            turn_num: p.turn_num(),
            source,
        })
}
