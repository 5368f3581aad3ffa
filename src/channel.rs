//! Two-party ledger channels and the consensus protocol to update them.
//!
//! A ledger channel is funded on-chain and then used to fund other channels
//! off-chain by locking parts of its balances in guarantees. Updates are
//! agreed on with a leader/follower protocol, see [ConsensusChannel].

mod consensus;
pub mod exit;
mod outcome;
mod proposal;
mod signed;
mod state;
mod vars;

use crate::abiencode::types::Destination;

pub use consensus::{ConsensusChannel, ConsensusError, Phase};
pub use outcome::{Balance, Guarantee, LedgerOutcome};
pub use proposal::{Proposal, ProposalKind, SignedProposal};
pub use signed::SignedVars;
pub use state::{FixedPart, State, StateError};
pub use vars::{Add, InvalidAdd, Vars};

/// Channel ids are used as destinations when one channel funds another.
pub type ChannelId = Destination;

/// Position of a participant in the channel. The leader proposes updates,
/// the follower countersigns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Leader = 0,
    Follower = 1,
}

impl Role {
    /// Index into the participants and signatures of the channel.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Role> {
        match index {
            0 => Some(Role::Leader),
            1 => Some(Role::Follower),
            _ => None,
        }
    }

    pub fn other(self) -> Role {
        match self {
            Role::Leader => Role::Follower,
            Role::Follower => Role::Leader,
        }
    }
}
