use super::{
    outcome::{Guarantee, LedgerOutcome},
    ChannelId,
};
use crate::abiencode::types::U256;
use thiserror::Error;

/// Reasons an [Add] cannot be applied to some [Vars].
///
/// The checks run in declaration order, the first failing one is reported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidAdd {
    #[error("incorrect turn number: expected {expected}, got {got}")]
    IncorrectTurnNum { expected: u64, got: u64 },
    #[error("duplicate guarantee detected for target {0:?}")]
    DuplicateGuarantee(ChannelId),
    #[error("left deposit {deposit} exceeds the guarantee amount {amount}")]
    InvalidDeposit { deposit: U256, amount: U256 },
    #[error("insufficient funds: {required} required, {available} available")]
    InsufficientFunds { required: U256, available: U256 },
}

/// The mutable part of a ledger channel's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vars {
    pub turn_num: u64,
    pub outcome: LedgerOutcome,
}

/// Proposal to fund a guarantee for `guarantee.target()`, with
/// `left_deposit` coming from the left balance and the rest from the right
/// balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Add {
    turn_num: u64,
    guarantee: Guarantee,
    left_deposit: U256,
}

impl Add {
    pub fn new(turn_num: u64, guarantee: Guarantee, left_deposit: U256) -> Self {
        Self {
            turn_num,
            guarantee,
            left_deposit,
        }
    }

    /// The turn number this add produces when applied.
    pub fn turn_num(&self) -> u64 {
        self.turn_num
    }

    pub(super) fn set_turn_num(&mut self, turn_num: u64) {
        self.turn_num = turn_num;
    }

    pub fn guarantee(&self) -> &Guarantee {
        &self.guarantee
    }

    pub fn target(&self) -> ChannelId {
        self.guarantee.target()
    }

    pub fn left_deposit(&self) -> U256 {
        self.left_deposit
    }

    /// `guarantee.amount - left_deposit`, or zero if the left deposit is
    /// larger (such an add is rejected by [Vars::add]).
    pub fn right_deposit(&self) -> U256 {
        self.guarantee.amount().saturating_sub(self.left_deposit)
    }
}

impl Vars {
    /// Apply `p` in place. On error `self` is left unchanged.
    pub fn add(&mut self, p: &Add) -> Result<(), InvalidAdd> {
        let expected = self.turn_num.saturating_add(1);
        if self.turn_num.checked_add(1) != Some(p.turn_num) {
            return Err(InvalidAdd::IncorrectTurnNum {
                expected,
                got: p.turn_num,
            });
        }

        let target = p.target();
        if self.outcome.includes_target(&target) {
            return Err(InvalidAdd::DuplicateGuarantee(target));
        }

        let amount = p.guarantee.amount();
        if p.left_deposit > amount {
            return Err(InvalidAdd::InvalidDeposit {
                deposit: p.left_deposit,
                amount,
            });
        }

        // Only the left balance has to cover the whole amount. The right
        // balance must still not go below zero.
        let left = self.outcome.left().amount();
        if left < amount {
            return Err(InvalidAdd::InsufficientFunds {
                required: amount,
                available: left,
            });
        }
        let right_deposit = amount - p.left_deposit;
        let right = self.outcome.right().amount();
        if right < right_deposit {
            return Err(InvalidAdd::InsufficientFunds {
                required: right_deposit,
                available: right,
            });
        }

        self.turn_num = p.turn_num;
        *self.outcome.left_mut().amount_mut() = left - p.left_deposit;
        *self.outcome.right_mut().amount_mut() = right - right_deposit;
        self.outcome.try_insert_guarantee(p.guarantee);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::outcome::tests::{dest, outcome};
    use proptest::prelude::*;

    fn vars(turn_num: u64, left: u64, right: u64) -> Vars {
        Vars {
            turn_num,
            outcome: outcome(left, right, &[]),
        }
    }

    fn add(turn_num: u64, amount: u64, target: u8, left_deposit: u64) -> Add {
        Add::new(
            turn_num,
            Guarantee::new(U256::from(amount), dest(target), dest(0xa1), dest(0xb0)),
            U256::from(left_deposit),
        )
    }

    #[test]
    fn add_moves_funds_into_guarantee() {
        let mut v = vars(0, 200, 300);
        let a = add(1, 10, 0x10, 10);
        v.add(&a).unwrap();

        assert_eq!(v.turn_num, 1);
        assert_eq!(v.outcome.left().amount(), U256::from(190));
        assert_eq!(v.outcome.right().amount(), U256::from(300));
        assert!(v.outcome.includes(a.guarantee()));
    }

    #[test]
    fn add_splits_deposit() {
        let mut v = vars(4, 200, 300);
        v.add(&add(5, 10, 0x10, 3)).unwrap();

        assert_eq!(v.outcome.left().amount(), U256::from(197));
        assert_eq!(v.outcome.right().amount(), U256::from(293));
    }

    #[test]
    fn wrong_turn_num() {
        let mut v = vars(0, 200, 300);
        for turn_num in [0, 2, u64::MAX] {
            assert_eq!(
                v.add(&add(turn_num, 10, 0x10, 10)),
                Err(InvalidAdd::IncorrectTurnNum {
                    expected: 1,
                    got: turn_num
                })
            );
        }
        assert_eq!(v, vars(0, 200, 300));
    }

    #[test]
    fn duplicate_target() {
        let mut v = vars(0, 200, 300);
        v.add(&add(1, 10, 0x10, 10)).unwrap();
        let before = v.clone();

        assert_eq!(
            v.add(&add(2, 1, 0x10, 1)),
            Err(InvalidAdd::DuplicateGuarantee(dest(0x10)))
        );
        assert_eq!(v, before);
    }

    #[test]
    fn deposit_larger_than_amount() {
        let mut v = vars(0, 200, 300);
        assert_eq!(
            v.add(&add(1, 10, 0x10, 11)),
            Err(InvalidAdd::InvalidDeposit {
                deposit: U256::from(11),
                amount: U256::from(10)
            })
        );
    }

    #[test]
    fn left_must_cover_whole_amount() {
        // Even though left only deposits 1, it has to hold the full amount.
        let mut v = vars(0, 5, 300);
        assert_eq!(
            v.add(&add(1, 10, 0x10, 1)),
            Err(InvalidAdd::InsufficientFunds {
                required: U256::from(10),
                available: U256::from(5)
            })
        );
        assert_eq!(v, vars(0, 5, 300));
    }

    #[test]
    fn right_must_cover_its_deposit() {
        let mut v = vars(0, 200, 3);
        assert_eq!(
            v.add(&add(1, 10, 0x10, 2)),
            Err(InvalidAdd::InsufficientFunds {
                required: U256::from(8),
                available: U256::from(3)
            })
        );
    }

    #[test]
    fn check_order() {
        // Wrong turn number and everything else wrong too.
        let mut v = vars(0, 0, 0);
        v.outcome = outcome(0, 0, &[*add(1, 1, 0x10, 0).guarantee()]);
        assert!(matches!(
            v.add(&add(7, 10, 0x10, 11)),
            Err(InvalidAdd::IncorrectTurnNum { .. })
        ));
        assert!(matches!(
            v.add(&add(1, 10, 0x10, 11)),
            Err(InvalidAdd::DuplicateGuarantee(_))
        ));
        assert!(matches!(
            v.add(&add(1, 10, 0x11, 11)),
            Err(InvalidAdd::InvalidDeposit { .. })
        ));
        assert!(matches!(
            v.add(&add(1, 10, 0x11, 10)),
            Err(InvalidAdd::InsufficientFunds { .. })
        ));
    }

    proptest! {
        #[test]
        fn sequential_adds_conserve_funds(
            left in 0u64..1_000,
            right in 0u64..1_000,
            adds in proptest::collection::vec((0u64..300, 0u64..300), 0..10),
        ) {
            let mut v = vars(0, left, right);
            let total = v.outcome.total();

            for (i, (amount, left_deposit)) in adds.into_iter().enumerate() {
                let before = v.clone();
                let a = add(v.turn_num + 1, amount, i as u8, left_deposit);
                match v.add(&a) {
                    Ok(()) => {
                        prop_assert_eq!(v.turn_num, before.turn_num + 1);
                        prop_assert!(v.outcome.includes(a.guarantee()));
                    }
                    Err(_) => prop_assert_eq!(&v, &before),
                }
                prop_assert_eq!(v.outcome.total(), total);
            }
        }
    }
}
