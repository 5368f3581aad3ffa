//! Rust representations of the on-chain outcome types (`ExitFormat`).
//!
//! A ledger channel only ever holds a single asset, but the adjudicator
//! expects the general multi-asset `SingleAssetExit[]`, so that is what gets
//! hashed into the state.

use crate::abiencode::{
    as_bytes,
    types::{Address, Destination, U256},
};
use serde::Serialize;
use thiserror::Error;

/// How the adjudicator pays out an [Allocation].
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(into = "u8")]
pub enum AllocationType {
    Simple = 0,
    Guarantee = 1,
}

impl From<AllocationType> for u8 {
    fn from(t: AllocationType) -> u8 {
        t as u8
    }
}

impl TryFrom<u8> for AllocationType {
    type Error = ExitError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Simple),
            1 => Ok(Self::Guarantee),
            other => Err(ExitError::UnknownAllocationType(other)),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub destination: Destination,
    pub amount: U256,
    pub allocation_type: AllocationType,
    #[serde(with = "as_bytes")]
    pub metadata: Vec<u8>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SingleAssetExit {
    pub asset: Address,
    #[serde(with = "as_bytes")]
    pub metadata: Vec<u8>,
    pub allocations: Vec<Allocation>,
}

/// `SingleAssetExit[]`
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Exit(pub Vec<SingleAssetExit>);

/// Metadata of a guarantee allocation: the two destinations the guaranteed
/// funds are reclaimed to, `left‖right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuaranteeMetadata {
    pub left: Destination,
    pub right: Destination,
}

impl GuaranteeMetadata {
    pub const ENCODED_LEN: usize = 64;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        buf.extend_from_slice(&self.left.0);
        buf.extend_from_slice(&self.right.0);
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, ExitError> {
        if data.len() != Self::ENCODED_LEN {
            return Err(ExitError::InvalidGuaranteeMetadata(data.len()));
        }
        let mut left = Destination::default();
        let mut right = Destination::default();
        left.0.copy_from_slice(&data[..32]);
        right.0.copy_from_slice(&data[32..]);
        Ok(Self { left, right })
    }
}

/// Reasons an [Exit] cannot be read back as a ledger outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExitError {
    #[error("unknown allocation type: {0}")]
    UnknownAllocationType(u8),
    #[error("guarantee metadata must be 64 bytes, got {0}")]
    InvalidGuaranteeMetadata(usize),
    #[error("ledger outcomes hold exactly one asset, got {0}")]
    NotSingleAsset(usize),
    #[error("ledger outcomes start with two simple allocations, got {0} allocations")]
    MissingBalances(usize),
    #[error("allocation {index} has the wrong type {got:?}")]
    UnexpectedAllocationType {
        index: usize,
        got: AllocationType,
    },
    #[error("guarantee for {0:?} appears twice")]
    DuplicateGuarantee(Destination),
}
