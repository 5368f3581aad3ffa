//! The funds held by a two-party ledger channel.
//!
//! A [LedgerOutcome] is the off-chain view of the channel's single-asset
//! exit: the two participants' balances followed by any guarantees that
//! fund other channels. [LedgerOutcome::as_outcome] builds the on-chain
//! [Exit] that gets signed.

use super::{
    exit::{Allocation, AllocationType, Exit, ExitError, GuaranteeMetadata, SingleAssetExit},
    ChannelId,
};
use crate::abiencode::types::{Address, Destination, U256};
use std::collections::BTreeMap;

/// Funds owned by a single destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    destination: Destination,
    amount: U256,
}

impl Balance {
    pub fn new(destination: Destination, amount: U256) -> Self {
        Self {
            destination,
            amount,
        }
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub(super) fn amount_mut(&mut self) -> &mut U256 {
        &mut self.amount
    }

    pub fn as_allocation(&self) -> Allocation {
        Allocation {
            destination: self.destination,
            amount: self.amount,
            allocation_type: AllocationType::Simple,
            metadata: Vec::new(),
        }
    }
}

/// Funds locked in the ledger channel to back the channel `target`. If the
/// target is ever closed on-chain the funds are reclaimed to `left` and
/// `right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guarantee {
    amount: U256,
    target: ChannelId,
    left: Destination,
    right: Destination,
}

impl Guarantee {
    pub fn new(amount: U256, target: ChannelId, left: Destination, right: Destination) -> Self {
        Self {
            amount,
            target,
            left,
            right,
        }
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn target(&self) -> ChannelId {
        self.target
    }

    pub fn left(&self) -> Destination {
        self.left
    }

    pub fn right(&self) -> Destination {
        self.right
    }

    pub fn as_allocation(&self) -> Allocation {
        Allocation {
            destination: self.target,
            amount: self.amount,
            allocation_type: AllocationType::Guarantee,
            metadata: GuaranteeMetadata {
                left: self.left,
                right: self.right,
            }
            .encode(),
        }
    }
}

/// Outcome of a ledger channel: one asset, two balances and at most one
/// guarantee per target channel.
///
/// Guarantees are kept ordered by target, so that two outcomes with the same
/// content always produce the same [Exit] (and therefore the same state
/// hash), no matter in which order the guarantees were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOutcome {
    asset: Address,
    left: Balance,
    right: Balance,
    guarantees: BTreeMap<ChannelId, Guarantee>,
}

impl LedgerOutcome {
    /// If `guarantees` contains more than one entry for a target, the last
    /// one is kept.
    pub fn new(
        asset: Address,
        left: Balance,
        right: Balance,
        guarantees: impl IntoIterator<Item = Guarantee>,
    ) -> Self {
        Self {
            asset,
            left,
            right,
            guarantees: guarantees.into_iter().map(|g| (g.target, g)).collect(),
        }
    }

    pub fn asset(&self) -> Address {
        self.asset
    }

    pub fn left(&self) -> &Balance {
        &self.left
    }

    pub fn right(&self) -> &Balance {
        &self.right
    }

    pub(super) fn left_mut(&mut self) -> &mut Balance {
        &mut self.left
    }

    pub(super) fn right_mut(&mut self) -> &mut Balance {
        &mut self.right
    }

    /// Guarantees in ascending order of their target.
    pub fn guarantees(&self) -> impl Iterator<Item = &Guarantee> + '_ {
        self.guarantees.values()
    }

    pub fn guarantee(&self, target: &ChannelId) -> Option<&Guarantee> {
        self.guarantees.get(target)
    }

    /// Insert a guarantee, returning `false` (and leaving the outcome
    /// untouched) if there already is one for the same target.
    pub(super) fn try_insert_guarantee(&mut self, g: Guarantee) -> bool {
        match self.guarantees.entry(g.target) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(g);
                true
            }
        }
    }

    /// Whether the outcome contains exactly this guarantee (target, amount
    /// and both destinations).
    pub fn includes(&self, g: &Guarantee) -> bool {
        self.guarantees.get(&g.target) == Some(g)
    }

    /// Whether the outcome contains any guarantee for `target`.
    pub fn includes_target(&self, target: &ChannelId) -> bool {
        self.guarantees.contains_key(target)
    }

    /// Channels funded by this ledger, in ascending order.
    pub fn funding_targets(&self) -> Vec<ChannelId> {
        self.guarantees.keys().copied().collect()
    }

    /// Sum of both balances and all guarantees. Saturates at `U256::MAX`.
    pub fn total(&self) -> U256 {
        self.guarantees
            .values()
            .fold(self.left.amount.saturating_add(self.right.amount), |acc, g| {
                acc.saturating_add(g.amount)
            })
    }

    /// The on-chain outcome: left, right, then the guarantees by target.
    pub fn as_outcome(&self) -> Exit {
        let mut allocations = Vec::with_capacity(2 + self.guarantees.len());
        allocations.push(self.left.as_allocation());
        allocations.push(self.right.as_allocation());
        allocations.extend(self.guarantees.values().map(Guarantee::as_allocation));

        Exit(vec![SingleAssetExit {
            asset: self.asset,
            metadata: Vec::new(),
            allocations,
        }])
    }

    /// Inverse of [LedgerOutcome::as_outcome].
    pub fn from_exit(exit: &Exit) -> Result<Self, ExitError> {
        let sae = match exit.0.as_slice() {
            [sae] => sae,
            other => return Err(ExitError::NotSingleAsset(other.len())),
        };

        let (left, right, rest) = match sae.allocations.as_slice() {
            [left, right, rest @ ..] => (left, right, rest),
            other => return Err(ExitError::MissingBalances(other.len())),
        };

        let left = balance_from_allocation(0, left)?;
        let right = balance_from_allocation(1, right)?;

        let mut outcome = Self::new(sae.asset, left, right, []);
        for (i, a) in rest.iter().enumerate() {
            if a.allocation_type != AllocationType::Guarantee {
                return Err(ExitError::UnexpectedAllocationType {
                    index: i + 2,
                    got: a.allocation_type,
                });
            }
            let meta = GuaranteeMetadata::decode(&a.metadata)?;
            let g = Guarantee::new(a.amount, a.destination, meta.left, meta.right);
            if !outcome.try_insert_guarantee(g) {
                return Err(ExitError::DuplicateGuarantee(a.destination));
            }
        }
        Ok(outcome)
    }
}

fn balance_from_allocation(index: usize, a: &Allocation) -> Result<Balance, ExitError> {
    match a.allocation_type {
        AllocationType::Simple => Ok(Balance::new(a.destination, a.amount)),
        got => Err(ExitError::UnexpectedAllocationType { index, got }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::abiencode::{self, types::Hash};
    use proptest::prelude::*;

    pub(crate) fn dest(b: u8) -> Destination {
        Destination([b; 32])
    }

    pub(crate) fn outcome(left: u64, right: u64, guarantees: &[Guarantee]) -> LedgerOutcome {
        LedgerOutcome::new(
            Address::default(),
            Balance::new(dest(0xa1), U256::from(left)),
            Balance::new(dest(0xb0), U256::from(right)),
            guarantees.iter().copied(),
        )
    }

    fn guarantee(amount: u64, target: u8) -> Guarantee {
        Guarantee::new(U256::from(amount), dest(target), dest(0xa1), dest(0xb0))
    }

    #[test]
    fn as_outcome_orders_allocations() {
        let o = outcome(200, 300, &[guarantee(7, 0x30), guarantee(5, 0x10)]);
        let exit = o.as_outcome();

        assert_eq!(exit.0.len(), 1);
        let allocs = &exit.0[0].allocations;
        assert_eq!(allocs.len(), 4);
        assert_eq!(allocs[0].destination, dest(0xa1));
        assert_eq!(allocs[0].amount, U256::from(200));
        assert_eq!(allocs[1].destination, dest(0xb0));
        assert_eq!(allocs[2].destination, dest(0x10));
        assert_eq!(allocs[2].allocation_type, AllocationType::Guarantee);
        assert_eq!(allocs[3].destination, dest(0x30));

        let mut meta = dest(0xa1).0.to_vec();
        meta.extend_from_slice(&dest(0xb0).0);
        assert_eq!(allocs[2].metadata, meta);
    }

    #[test]
    fn insertion_order_does_not_change_hash() {
        let a = outcome(1, 2, &[guarantee(1, 3), guarantee(2, 1), guarantee(3, 2)]);
        let b = outcome(1, 2, &[guarantee(2, 1), guarantee(3, 2), guarantee(1, 3)]);

        assert_eq!(a, b);
        assert_eq!(
            abiencode::to_hash(&a.as_outcome()).unwrap(),
            abiencode::to_hash(&b.as_outcome()).unwrap()
        );
    }

    #[test]
    fn includes_compares_all_fields() {
        let g = guarantee(5, 0x10);
        let o = outcome(1, 2, &[g]);

        assert!(o.includes(&g));
        assert!(o.includes_target(&g.target()));
        assert!(!o.includes(&guarantee(6, 0x10)));
        assert!(!o.includes(&Guarantee::new(
            g.amount(),
            g.target(),
            g.right(),
            g.left()
        )));
        assert!(!o.includes_target(&dest(0x11)));
    }

    #[test]
    fn funding_targets_and_total() {
        let o = outcome(200, 300, &[guarantee(7, 0x30), guarantee(5, 0x10)]);
        assert_eq!(o.funding_targets(), vec![dest(0x10), dest(0x30)]);
        assert_eq!(o.total(), U256::from(512));
    }

    #[test]
    fn from_exit_inverts_as_outcome() {
        let o = outcome(200, 300, &[guarantee(7, 0x30), guarantee(5, 0x10)]);
        assert_eq!(LedgerOutcome::from_exit(&o.as_outcome()), Ok(o));
    }

    #[test]
    fn from_exit_rejects_malformed() {
        let o = outcome(1, 2, &[guarantee(5, 0x10)]);

        let mut two_assets = o.as_outcome();
        two_assets.0.push(two_assets.0[0].clone());
        assert_eq!(
            LedgerOutcome::from_exit(&two_assets),
            Err(ExitError::NotSingleAsset(2))
        );

        let mut one_balance = o.as_outcome();
        one_balance.0[0].allocations.truncate(1);
        assert_eq!(
            LedgerOutcome::from_exit(&one_balance),
            Err(ExitError::MissingBalances(1))
        );

        let mut simple_guarantee = o.as_outcome();
        simple_guarantee.0[0].allocations[2].allocation_type = AllocationType::Simple;
        assert_eq!(
            LedgerOutcome::from_exit(&simple_guarantee),
            Err(ExitError::UnexpectedAllocationType {
                index: 2,
                got: AllocationType::Simple
            })
        );

        let mut duplicate = o.as_outcome();
        let g = duplicate.0[0].allocations[2].clone();
        duplicate.0[0].allocations.push(g);
        assert_eq!(
            LedgerOutcome::from_exit(&duplicate),
            Err(ExitError::DuplicateGuarantee(dest(0x10)))
        );
    }

    #[test]
    fn clone_is_independent() {
        let original = outcome(200, 300, &[guarantee(5, 0x10)]);
        let hash_before = abiencode::to_hash(&original.as_outcome()).unwrap();

        let mut copy = original.clone();
        copy.guarantees.insert(dest(0x10), guarantee(111, 0x10));
        *copy.left_mut().amount_mut() = U256::zero();
        assert!(copy.try_insert_guarantee(guarantee(1, 0x20)));

        assert_eq!(copy.guarantee(&dest(0x10)).map(Guarantee::amount), Some(U256::from(111)));
        assert_eq!(original.guarantee(&dest(0x10)), Some(&guarantee(5, 0x10)));
        assert_eq!(original.left().amount(), U256::from(200));
        assert!(!original.includes_target(&dest(0x20)));
        assert_eq!(
            abiencode::to_hash(&original.as_outcome()).unwrap(),
            hash_before
        );
        assert_ne!(Hash::default(), hash_before);
    }

    proptest! {
        #[test]
        fn clone_hashes_equal(
            left in any::<u64>(),
            right in any::<u64>(),
            targets in proptest::collection::btree_set(any::<u8>(), 0..8),
        ) {
            let gs: Vec<_> = targets.iter().map(|t| guarantee(u64::from(*t), *t)).collect();
            let o = outcome(left, right, &gs);
            let c = o.clone();
            prop_assert_eq!(&o, &c);
            prop_assert_eq!(
                abiencode::to_hash(&o.as_outcome()).unwrap(),
                abiencode::to_hash(&c.as_outcome()).unwrap()
            );
        }
    }
}
