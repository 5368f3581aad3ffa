//! Protobuf encoding of proposals (to send them to the other participant)
//! and of whole channels (to persist them).
//!
//! The messages are defined in `proto/ledger.proto`, their Rust counterparts
//! live in [ledgerwire]. Amounts are encoded as 32 byte big endian integers,
//! so nothing is lost compared to the on-chain representation.

mod conversion;
pub mod ledgerwire;

use crate::{
    abiencode::types::Destination,
    channel::{ConsensusChannel, ConsensusError, SignedProposal},
};
use prost::Message;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("missing field {0}")]
    ExpectedSome(&'static str),
    #[error("{field}: expected {expected} bytes, got {got}")]
    ByteLengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("expected 2 participants, got {0}")]
    ParticipantSizeMismatch(usize),
    #[error("unknown role index {0}")]
    UnknownRole(u32),
    #[error("guarantee for {0:?} appears twice")]
    DuplicateGuarantee(Destination),
    #[error("stored channel id {stored:?} does not match the fixed part ({computed:?})")]
    ChannelIdMismatch {
        stored: Destination,
        computed: Destination,
    },
    #[error("protobuf decoding failed: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("invalid channel: {0}")]
    Consensus(#[from] ConsensusError),
}

pub fn encode_signed_proposal(p: &SignedProposal) -> Vec<u8> {
    ledgerwire::SignedProposal::from(p).encode_to_vec()
}

pub fn decode_signed_proposal(buf: &[u8]) -> Result<SignedProposal, ConversionError> {
    ledgerwire::SignedProposal::decode(buf)?.try_into()
}

/// Snapshot of one participant's view of the channel, including the queued
/// proposals.
pub fn encode_channel(channel: &ConsensusChannel) -> Vec<u8> {
    ledgerwire::ConsensusChannel::from(channel).encode_to_vec()
}

/// Inverse of [encode_channel]. The consensus state and every queued
/// proposal are verified again before the channel is returned.
pub fn decode_channel(buf: &[u8]) -> Result<ConsensusChannel, ConversionError> {
    ledgerwire::ConsensusChannel::decode(buf)?.try_into()
}

#[cfg(test)]
mod tests;
