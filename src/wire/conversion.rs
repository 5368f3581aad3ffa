//! Conversions between the channel types and their [ledgerwire] messages.
//!
//! Encoding never fails. Decoding checks lengths and presence of every field
//! but leaves the protocol checks (signatures, turn numbers) to the channel.

use super::{ledgerwire, ConversionError};
use crate::{
    abiencode::types::{Address, Destination, Signature, U256},
    channel::{
        Add, Balance, ConsensusChannel, FixedPart, Guarantee, LedgerOutcome, Proposal,
        ProposalKind, Role, SignedProposal, SignedVars, Vars,
    },
};

fn fixed_bytes<const N: usize>(
    value: Vec<u8>,
    field: &'static str,
) -> Result<[u8; N], ConversionError> {
    let got = value.len();
    value.try_into().map_err(|_| ConversionError::ByteLengthMismatch {
        field,
        expected: N,
        got,
    })
}

fn destination(value: Vec<u8>, field: &'static str) -> Result<Destination, ConversionError> {
    Ok(Destination(fixed_bytes(value, field)?))
}

fn address(value: Vec<u8>, field: &'static str) -> Result<Address, ConversionError> {
    Ok(Address(fixed_bytes(value, field)?))
}

fn signature(value: Vec<u8>, field: &'static str) -> Result<Signature, ConversionError> {
    Ok(Signature(fixed_bytes(value, field)?))
}

fn u256(value: &[u8], field: &'static str) -> Result<U256, ConversionError> {
    if value.len() > 32 {
        return Err(ConversionError::ByteLengthMismatch {
            field,
            expected: 32,
            got: value.len(),
        });
    }
    Ok(U256::from_big_endian(value))
}

fn u256_bytes(value: U256) -> Vec<u8> {
    value.to_be_array().to_vec()
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ConversionError> {
    value.ok_or(ConversionError::ExpectedSome(field))
}

fn signature_pair(
    value: Vec<Vec<u8>>,
    field: &'static str,
) -> Result<[Signature; 2], ConversionError> {
    let [leader, follower]: [Vec<u8>; 2] = value
        .try_into()
        .map_err(|v: Vec<Vec<u8>>| ConversionError::ParticipantSizeMismatch(v.len()))?;
    Ok([signature(leader, field)?, signature(follower, field)?])
}

impl From<&Balance> for ledgerwire::Balance {
    fn from(value: &Balance) -> Self {
        Self {
            destination: value.destination().0.to_vec(),
            amount: u256_bytes(value.amount()),
        }
    }
}

impl TryFrom<ledgerwire::Balance> for Balance {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::Balance) -> Result<Self, Self::Error> {
        Ok(Balance::new(
            destination(value.destination, "balance.destination")?,
            u256(&value.amount, "balance.amount")?,
        ))
    }
}

impl From<&Guarantee> for ledgerwire::Guarantee {
    fn from(value: &Guarantee) -> Self {
        Self {
            amount: u256_bytes(value.amount()),
            target: value.target().0.to_vec(),
            left: value.left().0.to_vec(),
            right: value.right().0.to_vec(),
        }
    }
}

impl TryFrom<ledgerwire::Guarantee> for Guarantee {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::Guarantee) -> Result<Self, Self::Error> {
        Ok(Guarantee::new(
            u256(&value.amount, "guarantee.amount")?,
            destination(value.target, "guarantee.target")?,
            destination(value.left, "guarantee.left")?,
            destination(value.right, "guarantee.right")?,
        ))
    }
}

impl From<&LedgerOutcome> for ledgerwire::LedgerOutcome {
    fn from(value: &LedgerOutcome) -> Self {
        Self {
            asset: value.asset().0.to_vec(),
            left: Some(value.left().into()),
            right: Some(value.right().into()),
            guarantees: value.guarantees().map(Into::into).collect(),
        }
    }
}

impl TryFrom<ledgerwire::LedgerOutcome> for LedgerOutcome {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::LedgerOutcome) -> Result<Self, Self::Error> {
        let guarantees = value
            .guarantees
            .into_iter()
            .map(Guarantee::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        // LedgerOutcome::new would silently keep the last of two guarantees
        // with the same target.
        let mut targets: Vec<_> = guarantees.iter().map(Guarantee::target).collect();
        targets.sort();
        if let Some(w) = targets.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConversionError::DuplicateGuarantee(w[0]));
        }

        Ok(LedgerOutcome::new(
            address(value.asset, "outcome.asset")?,
            required(value.left, "outcome.left")?.try_into()?,
            required(value.right, "outcome.right")?.try_into()?,
            guarantees,
        ))
    }
}

impl From<&Vars> for ledgerwire::Vars {
    fn from(value: &Vars) -> Self {
        Self {
            turn_num: value.turn_num,
            outcome: Some((&value.outcome).into()),
        }
    }
}

impl TryFrom<ledgerwire::Vars> for Vars {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::Vars) -> Result<Self, Self::Error> {
        Ok(Vars {
            turn_num: value.turn_num,
            outcome: required(value.outcome, "vars.outcome")?.try_into()?,
        })
    }
}

impl From<&SignedVars> for ledgerwire::SignedVars {
    fn from(value: &SignedVars) -> Self {
        Self {
            vars: Some((&value.vars).into()),
            signatures: value.signatures.iter().map(|s| s.0.to_vec()).collect(),
        }
    }
}

impl TryFrom<ledgerwire::SignedVars> for SignedVars {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::SignedVars) -> Result<Self, Self::Error> {
        Ok(SignedVars {
            vars: required(value.vars, "signed_vars.vars")?.try_into()?,
            signatures: signature_pair(value.signatures, "signed_vars.signatures")?,
        })
    }
}

impl From<&Add> for ledgerwire::Add {
    fn from(value: &Add) -> Self {
        Self {
            turn_num: value.turn_num(),
            guarantee: Some(value.guarantee().into()),
            left_deposit: u256_bytes(value.left_deposit()),
        }
    }
}

impl TryFrom<ledgerwire::Add> for Add {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::Add) -> Result<Self, Self::Error> {
        Ok(Add::new(
            value.turn_num,
            required(value.guarantee, "add.guarantee")?.try_into()?,
            u256(&value.left_deposit, "add.left_deposit")?,
        ))
    }
}

impl From<&Proposal> for ledgerwire::Proposal {
    fn from(value: &Proposal) -> Self {
        let kind = match &value.kind {
            ProposalKind::Add(add) => ledgerwire::proposal::Kind::Add(add.into()),
        };
        Self {
            channel_id: value.channel_id.0.to_vec(),
            kind: Some(kind),
        }
    }
}

impl TryFrom<ledgerwire::Proposal> for Proposal {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::Proposal) -> Result<Self, Self::Error> {
        let kind = match required(value.kind, "proposal.kind")? {
            ledgerwire::proposal::Kind::Add(add) => ProposalKind::Add(add.try_into()?),
        };
        Ok(Proposal {
            channel_id: destination(value.channel_id, "proposal.channel_id")?,
            kind,
        })
    }
}

impl From<&SignedProposal> for ledgerwire::SignedProposal {
    fn from(value: &SignedProposal) -> Self {
        Self {
            proposal: Some((&value.proposal).into()),
            signature: value.signature.0.to_vec(),
        }
    }
}

impl TryFrom<ledgerwire::SignedProposal> for SignedProposal {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::SignedProposal) -> Result<Self, Self::Error> {
        Ok(SignedProposal {
            proposal: required(value.proposal, "signed_proposal.proposal")?.try_into()?,
            signature: signature(value.signature, "signed_proposal.signature")?,
        })
    }
}

impl From<&FixedPart> for ledgerwire::FixedPart {
    fn from(value: &FixedPart) -> Self {
        Self {
            participants: value.participants.iter().map(|a| a.0.to_vec()).collect(),
            chain_id: u256_bytes(value.chain_id),
            channel_nonce: value.channel_nonce,
            challenge_duration: value.challenge_duration,
        }
    }
}

impl TryFrom<ledgerwire::FixedPart> for FixedPart {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::FixedPart) -> Result<Self, Self::Error> {
        let [leader, follower]: [Vec<u8>; 2] = value
            .participants
            .try_into()
            .map_err(|v: Vec<Vec<u8>>| ConversionError::ParticipantSizeMismatch(v.len()))?;
        Ok(FixedPart {
            participants: [
                address(leader, "fixed_part.participants")?,
                address(follower, "fixed_part.participants")?,
            ],
            chain_id: u256(&value.chain_id, "fixed_part.chain_id")?,
            channel_nonce: value.channel_nonce,
            challenge_duration: value.challenge_duration,
        })
    }
}

impl From<&ConsensusChannel> for ledgerwire::ConsensusChannel {
    fn from(value: &ConsensusChannel) -> Self {
        Self {
            id: value.id().0.to_vec(),
            fixed_part: Some(value.fixed_part().into()),
            my_index: value.my_index().index() as u32,
            current: Some(value.current().into()),
            proposal_queue: value.proposal_queue().iter().map(Into::into).collect(),
        }
    }
}

/// Restores the channel with [ConsensusChannel::restore], so all signatures
/// are checked again.
impl TryFrom<ledgerwire::ConsensusChannel> for ConsensusChannel {
    type Error = ConversionError;

    fn try_from(value: ledgerwire::ConsensusChannel) -> Result<Self, Self::Error> {
        let id = destination(value.id, "channel.id")?;
        let my_index = Role::from_index(value.my_index as usize)
            .ok_or(ConversionError::UnknownRole(value.my_index))?;
        let proposal_queue = value
            .proposal_queue
            .into_iter()
            .map(SignedProposal::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let channel = ConsensusChannel::restore(
            required(value.fixed_part, "channel.fixed_part")?.try_into()?,
            my_index,
            required(value.current, "channel.current")?.try_into()?,
            proposal_queue,
        )?;
        if channel.id() != id {
            return Err(ConversionError::ChannelIdMismatch {
                stored: id,
                computed: channel.id(),
            });
        }
        Ok(channel)
    }
}
