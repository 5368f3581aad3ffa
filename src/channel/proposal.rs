//! Updates the leader proposes to the ledger's outcome.
//!
//! Proposals are pipelined: the leader may send several before the follower
//! has countersigned any of them. Each one is signed over the full state that
//! results from applying it (and all earlier queued proposals) to the
//! current consensus state.

use super::{
    vars::{Add, InvalidAdd, Vars},
    ChannelId,
};
use crate::abiencode::types::Signature;

/// The kinds of update a ledger channel supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalKind {
    Add(Add),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub channel_id: ChannelId,
    pub kind: ProposalKind,
}

impl Proposal {
    pub fn add(channel_id: ChannelId, add: Add) -> Self {
        Self {
            channel_id,
            kind: ProposalKind::Add(add),
        }
    }

    /// Turn number of the state produced by this proposal.
    pub fn turn_num(&self) -> u64 {
        match &self.kind {
            ProposalKind::Add(add) => add.turn_num(),
        }
    }

    /// The channel funded (or otherwise affected) by this proposal.
    pub fn target(&self) -> ChannelId {
        match &self.kind {
            ProposalKind::Add(add) => add.target(),
        }
    }
}

/// A proposal together with one participant's signature over the resulting
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedProposal {
    pub proposal: Proposal,
    pub signature: Signature,
}

impl SignedProposal {
    pub fn turn_num(&self) -> u64 {
        self.proposal.turn_num()
    }

    pub fn channel_id(&self) -> ChannelId {
        self.proposal.channel_id
    }
}

impl Vars {
    pub fn apply(&mut self, kind: &ProposalKind) -> Result<(), InvalidAdd> {
        match kind {
            ProposalKind::Add(add) => self.add(add),
        }
    }
}
